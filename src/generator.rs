use crate::conf_files;
use crate::data_files;
use crate::error::CircosError;
use crate::genome_store::GenomeStore;
use crate::layout;
use crate::params::{self, JobConfig};
use crate::track_collector;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What one successful job produced.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub job_dir: PathBuf,
    pub genome: String,
    pub tile_plot_count: usize,
    pub non_tile_plot_count: usize,
    pub data_files: Vec<String>,
}

/// Runs one complete job: parse the request parameters, collect track data,
/// write the per-track data files and derived statistics, plan the radial
/// layout and emit the renderer configuration under `<out_root>/<job_id>/`.
///
/// Each call is self-contained; nothing is shared between jobs and a failed
/// job's directory can simply be discarded.
pub fn generate_artifacts(
    store: &dyn GenomeStore,
    parameters: &HashMap<String, String>,
    out_root: &Path,
) -> Result<JobSummary, CircosError> {
    let config = params::parse_parameters(parameters)?;

    let genome = store.genome_name(&config.genome_id)?;
    let accessions = store.accessions(&config.genome_id)?;
    if accessions.is_empty() {
        return Err(CircosError::data_unavailable(format!(
            "No accessions found for genome '{}'",
            config.genome_id
        )));
    }

    let mut tracks = track_collector::collect_tracks(store, &config)?;

    let job_id = job_id(&config, parameters);
    let job_dir = out_root.join(&job_id);
    let data_dir = job_dir.join("data");
    let conf_dir = job_dir.join("conf");
    for dir in [&data_dir, &conf_dir] {
        fs::create_dir_all(dir).map_err(|e| {
            CircosError::io(format!("Could not create job directory '{}': {e}", dir.display()))
        })?;
    }
    log::info!("Generating artifacts for genome '{genome}' in '{}'", job_dir.display());

    let data_files =
        data_files::write_data_files(&mut tracks, &config, &genome, &accessions, &data_dir)?;
    let layout = layout::plan_layout(&tracks, &config, &data_dir)?;
    conf_files::write_conf_files(&job_dir, &layout, config.image_size)?;

    Ok(JobSummary {
        job_id,
        job_dir,
        genome,
        tile_plot_count: layout.tile_plots.len(),
        non_tile_plot_count: layout.non_tile_plots.len(),
        data_files,
    })
}

/// Job ids hash the genome id and request fingerprint with the wall clock,
/// so repeated requests land in distinct directories.
fn job_id(config: &JobConfig, parameters: &HashMap<String, String>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(config.genome_id.as_bytes());
    let mut keys: Vec<&String> = parameters.keys().collect();
    keys.sort();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update(parameters[key].as_bytes());
    }
    hasher.update(now_unix_nanos().to_le_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn now_unix_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
