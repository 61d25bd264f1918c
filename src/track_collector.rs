use crate::error::CircosError;
use crate::genome_store::GenomeStore;
use crate::params::JobConfig;
use crate::track::{Strand, Track, TrackKind, TrackMap};

/// Fetches feature records for every selected track, in stacking order:
/// builtin feature/strand combinations first, then custom queries by
/// ascending index. GC statistic and upload tracks are appended later by the
/// data-file writer.
pub fn collect_tracks(
    store: &dyn GenomeStore,
    config: &JobConfig,
) -> Result<TrackMap, CircosError> {
    let mut tracks = TrackMap::new();

    for key in &config.builtin_tracks {
        let (feature_class, strand_word) = key.split_once('_').ok_or_else(|| {
            CircosError::internal(format!("Malformed builtin track key '{key}'"))
        })?;
        let strand = if strand_word == "forward" {
            Strand::Forward
        } else {
            Strand::Reverse
        };
        log::info!("Collecting {key} features");
        let records = store.features(&config.genome_id, feature_class, Some(strand), None)?;
        tracks.insert(Track::new(key.clone(), TrackKind::BuiltinFeature, records));
    }

    for custom in &config.custom_tracks {
        let name = format!("custom_track_{}", custom.index);
        log::info!(
            "Collecting {name} features (type '{}', strand {:?})",
            custom.feature_type,
            custom.strand
        );
        let records = store.features(
            &config.genome_id,
            &custom.feature_type,
            custom.strand,
            custom.keywords.as_deref(),
        )?;
        tracks.insert(Track::new(name, TrackKind::CustomQuery, records));
    }

    Ok(tracks)
}
