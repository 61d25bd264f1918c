use crate::error::CircosError;
use crate::genome_store::AccessionRecord;
use crate::params::JobConfig;
use crate::sequence_stats::{GC_WINDOW_SIZE, GcMetric, compute_window_stats};
use crate::track::{FeatureRecord, Track, TrackKind, TrackMap};
use itertools::Itertools;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes every per-track data file plus the karyotype and large-tiles files
/// into `data_dir`, and registers the synthetic GC and upload tracks in the
/// track map so the layout planner allocates them radial slots.
///
/// A failing feature-track file is logged and dropped from the map without
/// aborting its siblings; the karyotype file (and the large-tiles file when
/// the outer track was requested) is required and aborts the job.
///
/// Returns the names of the files actually written.
pub fn write_data_files(
    tracks: &mut TrackMap,
    config: &JobConfig,
    genome_name: &str,
    accessions: &[AccessionRecord],
    data_dir: &Path,
) -> Result<Vec<String>, CircosError> {
    let mut written = Vec::new();
    let mut failed_tracks: Vec<String> = Vec::new();

    for track in tracks.iter() {
        let file_name = track.data_file_name();
        log::info!("Writing data file for track '{}'", track.name);
        match write_track_file(&data_dir.join(&file_name), &track.records) {
            Ok(()) => written.push(file_name),
            Err(e) => {
                log::warn!(
                    "Dropping track '{}': could not write '{file_name}': {e}",
                    track.name
                );
                failed_tracks.push(track.name.clone());
            }
        }
    }
    if !failed_tracks.is_empty() {
        tracks.retain(|t| !failed_tracks.contains(&t.name));
    }

    let genome_label = genome_name.replace(' ', "_");
    log::info!("Creating karyotype file for genome '{genome_name}'");
    write_karyotype(&data_dir.join("karyotype.txt"), &genome_label, accessions).map_err(|e| {
        CircosError::io(format!("Could not write required karyotype file: {e}"))
    })?;
    written.push("karyotype.txt".to_string());

    log::info!("Creating large tiles file for genome '{genome_name}'");
    match write_large_tiles(&data_dir.join("large.tiles.txt"), accessions) {
        Ok(()) => written.push("large.tiles.txt".to_string()),
        Err(e) if config.include_outer_track => {
            return Err(CircosError::io(format!(
                "Could not write large tiles file needed for the outer track: {e}"
            )));
        }
        Err(e) => log::warn!("Could not write large tiles file: {e}"),
    }

    if config.gc_content_plot_type.is_some() {
        log::info!("Creating data file for GC content");
        match write_stat_file(&data_dir.join("gc.content.txt"), accessions, GcMetric::Content) {
            Ok(()) => {
                tracks.insert(Track::synthetic("gc_content", TrackKind::GcContent));
                written.push("gc.content.txt".to_string());
            }
            Err(e) => log::warn!("Skipping GC content track: {e}"),
        }
    }

    if config.gc_skew_plot_type.is_some() {
        log::info!("Creating data file for GC skew");
        match write_stat_file(&data_dir.join("gc.skew.txt"), accessions, GcMetric::Skew) {
            Ok(()) => {
                tracks.insert(Track::synthetic("gc_skew", TrackKind::GcSkew));
                written.push("gc.skew.txt".to_string());
            }
            Err(e) => log::warn!("Skipping GC skew track: {e}"),
        }
    }

    for upload in &config.uploads {
        let file_name = format!("user.upload.{}.txt", upload.index);
        log::info!("Writing uploaded data file '{file_name}'");
        match fs::write(data_dir.join(&file_name), &upload.content) {
            Ok(()) => {
                tracks.insert(Track::synthetic(
                    format!("user_upload_{}", upload.index),
                    TrackKind::UserUpload {
                        file_name: file_name.clone(),
                        plot_type: upload.plot_type,
                    },
                ));
                written.push(file_name);
            }
            Err(e) => log::warn!("Skipping upload {}: could not write '{file_name}': {e}", upload.index),
        }
    }

    Ok(written)
}

/// One row per feature: `accession  start  end  id=<id>`, sorted by accession
/// and start so reruns produce identical files.
fn write_track_file(path: &Path, records: &[FeatureRecord]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records
        .iter()
        .sorted_by(|a, b| a.accession.cmp(&b.accession).then(a.start.cmp(&b.start)))
    {
        writeln!(
            writer,
            "{}\t{}\t{}\tid={}",
            record.accession, record.start, record.end, record.id
        )?;
    }
    writer.flush()
}

fn write_karyotype(
    path: &Path,
    genome_label: &str,
    accessions: &[AccessionRecord],
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for accession in accessions {
        writeln!(
            writer,
            "chr\t-\t{}\t{}\t0\t{}\tgrey",
            accession.accession, genome_label, accession.length
        )?;
    }
    writer.flush()
}

fn write_large_tiles(path: &Path, accessions: &[AccessionRecord]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for accession in accessions {
        writeln!(writer, "{}\t0\t{}", accession.accession, accession.length)?;
    }
    writer.flush()
}

/// One row per window across all accessions, in karyotype order.
fn write_stat_file(
    path: &Path,
    accessions: &[AccessionRecord],
    metric: GcMetric,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for accession in accessions {
        let windows = compute_window_stats(
            &accession.accession,
            &accession.sequence,
            GC_WINDOW_SIZE,
            metric,
        );
        for window in windows {
            writeln!(
                writer,
                "{}\t{}\t{}\t{:.6}",
                window.accession, window.start_index, window.end_index, window.value
            )?;
        }
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::parse_parameters;
    use crate::track::PlotType;
    use std::collections::HashMap;

    fn accession(name: &str, sequence: String) -> AccessionRecord {
        AccessionRecord {
            accession: name.to_string(),
            length: sequence.len() as u64,
            sequence,
        }
    }

    fn config(pairs: &[(&str, &str)]) -> JobConfig {
        let mut parameters: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        parameters.insert("gid".to_string(), "83332.12".to_string());
        parse_parameters(&parameters).unwrap()
    }

    fn feature(accession: &str, start: u64, id: u64) -> FeatureRecord {
        FeatureRecord {
            accession: accession.to_string(),
            start,
            end: start + 500,
            id,
        }
    }

    #[test]
    fn test_track_file_rows_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracks = TrackMap::new();
        tracks.insert(Track::new(
            "cds_forward",
            TrackKind::BuiltinFeature,
            vec![
                feature("NC_000962", 5000, 2),
                feature("NC_000913", 100, 3),
                feature("NC_000962", 100, 1),
            ],
        ));
        let accessions = [accession("NC_000962", "ACGT".repeat(10))];
        write_data_files(
            &mut tracks,
            &config(&[("cds_forward", "on")]),
            "Mycobacterium tuberculosis H37Rv",
            &accessions,
            dir.path(),
        )
        .unwrap();

        let text = fs::read_to_string(dir.path().join("cds.forward.txt")).unwrap();
        assert_eq!(
            text,
            "NC_000913\t100\t600\tid=3\nNC_000962\t100\t600\tid=1\nNC_000962\t5000\t5500\tid=2\n"
        );
    }

    #[test]
    fn test_karyotype_and_large_tiles_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracks = TrackMap::new();
        let accessions = [
            accession("NC_000962", "ACGT".repeat(4)),
            accession("pMT01", "GGCC".repeat(2)),
        ];
        write_data_files(
            &mut tracks,
            &config(&[]),
            "Mycobacterium tuberculosis H37Rv",
            &accessions,
            dir.path(),
        )
        .unwrap();

        let karyotype = fs::read_to_string(dir.path().join("karyotype.txt")).unwrap();
        assert_eq!(
            karyotype,
            "chr\t-\tNC_000962\tMycobacterium_tuberculosis_H37Rv\t0\t16\tgrey\n\
             chr\t-\tpMT01\tMycobacterium_tuberculosis_H37Rv\t0\t8\tgrey\n"
        );

        let tiles = fs::read_to_string(dir.path().join("large.tiles.txt")).unwrap();
        assert_eq!(tiles, "NC_000962\t0\t16\npMT01\t0\t8\n");
    }

    #[test]
    fn test_gc_files_register_synthetic_tracks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracks = TrackMap::new();
        tracks.insert(Track::new("cds_forward", TrackKind::BuiltinFeature, vec![]));
        let accessions = [accession("NC_000962", "GGCCAATT".repeat(1000))];
        let written = write_data_files(
            &mut tracks,
            &config(&[
                ("cds_forward", "on"),
                ("gc_content_plot_type", "line"),
                ("gc_skew_plot_type", "histogram"),
            ]),
            "Mycobacterium tuberculosis H37Rv",
            &accessions,
            dir.path(),
        )
        .unwrap();

        assert_eq!(tracks.names(), vec!["cds_forward", "gc_content", "gc_skew"]);
        assert!(written.contains(&"gc.content.txt".to_string()));

        // 8000 bases -> 4 windows, values formatted with 6 decimals.
        let content = fs::read_to_string(dir.path().join("gc.content.txt")).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], "NC_000962\t0\t2000\t0.500000");
    }

    #[test]
    fn test_upload_files_written_and_registered() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracks = TrackMap::new();
        let accessions = [accession("NC_000962", "ACGT".repeat(4))];
        write_data_files(
            &mut tracks,
            &config(&[
                ("file_2", "NC_000962\t0\t1999\t0.25\n"),
                ("file_plot_type_2", "line"),
            ]),
            "Mycobacterium tuberculosis H37Rv",
            &accessions,
            dir.path(),
        )
        .unwrap();

        assert_eq!(tracks.names(), vec!["user_upload_2"]);
        let upload = fs::read_to_string(dir.path().join("user.upload.2.txt")).unwrap();
        assert_eq!(upload, "NC_000962\t0\t1999\t0.25\n");
        match &tracks.get("user_upload_2").unwrap().kind {
            TrackKind::UserUpload {
                file_name,
                plot_type,
            } => {
                assert_eq!(file_name, "user.upload.2.txt");
                assert_eq!(*plot_type, PlotType::Line);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_failing_track_file_is_dropped_but_job_continues() {
        let dir = tempfile::tempdir().unwrap();
        // Occupy the track's file name with a directory so File::create fails.
        fs::create_dir(dir.path().join("cds.forward.txt")).unwrap();

        let mut tracks = TrackMap::new();
        tracks.insert(Track::new(
            "cds_forward",
            TrackKind::BuiltinFeature,
            vec![feature("NC_000962", 100, 1)],
        ));
        tracks.insert(Track::new("rna_forward", TrackKind::BuiltinFeature, vec![]));
        let accessions = [accession("NC_000962", "ACGT".repeat(4))];
        write_data_files(
            &mut tracks,
            &config(&[("cds_forward", "on"), ("rna_forward", "on")]),
            "Mycobacterium tuberculosis H37Rv",
            &accessions,
            dir.path(),
        )
        .unwrap();

        // The broken track is gone, its sibling and the karyotype survive.
        assert_eq!(tracks.names(), vec!["rna_forward"]);
        assert!(dir.path().join("rna.forward.txt").exists());
        assert!(dir.path().join("karyotype.txt").exists());
    }
}
