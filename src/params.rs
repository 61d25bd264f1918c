use crate::error::CircosError;
use crate::track::{PlotType, Strand};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_IMAGE_SIZE: u32 = 1000;
pub const DEFAULT_TRACK_WIDTH_PERCENT: u32 = 3;

/// The six builtin feature/strand combinations, in the order tracks are
/// stacked when selected.
pub const BUILTIN_TRACK_KEYS: [&str; 6] = [
    "cds_forward",
    "cds_reverse",
    "rna_forward",
    "rna_reverse",
    "misc_forward",
    "misc_reverse",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CustomTrackRequest {
    pub index: u32,
    pub feature_type: String,
    pub strand: Option<Strand>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub index: u32,
    pub plot_type: PlotType,
    pub content: String,
}

/// All parameters of one image job. Built fresh per request and threaded
/// through every stage; the engine keeps no cross-job state.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub genome_id: String,
    pub gc_content_plot_type: Option<PlotType>,
    pub gc_skew_plot_type: Option<PlotType>,
    pub include_outer_track: bool,
    pub image_size: u32,
    pub track_width: f32,
    pub builtin_tracks: Vec<String>,
    pub custom_tracks: Vec<CustomTrackRequest>,
    pub uploads: Vec<UploadRequest>,
}

/// Parses the flat form-parameter map of one request.
pub fn parse_parameters(parameters: &HashMap<String, String>) -> Result<JobConfig, CircosError> {
    let genome_id = parameters
        .get("gid")
        .map(|v| v.trim())
        .unwrap_or("");
    if genome_id.is_empty() {
        return Err(CircosError::invalid_input(
            "Missing genome id parameter 'gid'",
        ));
    }

    let config = JobConfig {
        genome_id: genome_id.to_string(),
        gc_content_plot_type: optional_plot_type(parameters, "gc_content_plot_type")?,
        gc_skew_plot_type: optional_plot_type(parameters, "gc_skew_plot_type")?,
        include_outer_track: parameters
            .get("include_outer_track")
            .is_some_and(|v| v == "on"),
        image_size: numeric_parameter(parameters, "image_dimensions", DEFAULT_IMAGE_SIZE)?,
        track_width: numeric_parameter(parameters, "track_width", DEFAULT_TRACK_WIDTH_PERCENT)?
            as f32
            / 100.0,
        builtin_tracks: BUILTIN_TRACK_KEYS
            .iter()
            .filter(|key| parameters.contains_key(**key))
            .map(|key| key.to_string())
            .collect(),
        custom_tracks: custom_track_requests(parameters)?,
        uploads: upload_requests(parameters)?,
    };
    Ok(config)
}

fn optional_plot_type(
    parameters: &HashMap<String, String>,
    key: &str,
) -> Result<Option<PlotType>, CircosError> {
    match parameters.get(key) {
        None => Ok(None),
        Some(value) => PlotType::from_keyword(value)
            .map(Some)
            .ok_or_else(|| {
                CircosError::invalid_input(format!("Unknown plot type '{value}' for '{key}'"))
            }),
    }
}

fn numeric_parameter(
    parameters: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> Result<u32, CircosError> {
    match parameters.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(value) => value.parse::<u32>().map_err(|_| {
            CircosError::invalid_input(format!("Parameter '{key}' is not a number: '{value}'"))
        }),
    }
}

fn custom_track_requests(
    parameters: &HashMap<String, String>,
) -> Result<Vec<CustomTrackRequest>, CircosError> {
    let key_pattern = Regex::new(r"^custom_track_.*_(\d+)$")
        .map_err(|e| CircosError::internal(format!("Bad custom track pattern: {e}")))?;

    // BTreeSet so custom tracks stack by ascending index, independent of
    // parameter-map iteration order.
    let mut indices = BTreeSet::new();
    for key in parameters.keys() {
        if let Some(caps) = key_pattern.captures(key) {
            let index: u32 = caps[1].parse().map_err(|_| {
                CircosError::invalid_input(format!("Custom track key '{key}' has a bad index"))
            })?;
            indices.insert(index);
        }
    }

    let mut requests = Vec::with_capacity(indices.len());
    for index in indices {
        let feature_type = parameters
            .get(&format!("custom_track_type_{index}"))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CircosError::invalid_input(format!(
                    "Custom track {index} is missing 'custom_track_type_{index}'"
                ))
            })?;
        // Anything other than forward/reverse means "no strand restriction".
        let strand = match parameters
            .get(&format!("custom_track_strand_{index}"))
            .map(String::as_str)
        {
            Some("forward") => Some(Strand::Forward),
            Some("reverse") => Some(Strand::Reverse),
            _ => None,
        };
        let keywords = parameters
            .get(&format!("custom_track_keyword_{index}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        requests.push(CustomTrackRequest {
            index,
            feature_type: feature_type.to_string(),
            strand,
            keywords,
        });
    }
    Ok(requests)
}

fn upload_requests(
    parameters: &HashMap<String, String>,
) -> Result<Vec<UploadRequest>, CircosError> {
    let key_pattern = Regex::new(r"^file_(\d+)$")
        .map_err(|e| CircosError::internal(format!("Bad upload pattern: {e}")))?;

    let mut indices = BTreeSet::new();
    for (key, content) in parameters {
        if let Some(caps) = key_pattern.captures(key) {
            if content.is_empty() {
                continue;
            }
            let index: u32 = caps[1].parse().map_err(|_| {
                CircosError::invalid_input(format!("Upload key '{key}' has a bad index"))
            })?;
            indices.insert(index);
        }
    }

    let mut requests = Vec::with_capacity(indices.len());
    for index in indices {
        let plot_type_key = format!("file_plot_type_{index}");
        let plot_type = parameters
            .get(&plot_type_key)
            .and_then(|v| PlotType::from_keyword(v))
            .ok_or_else(|| {
                CircosError::invalid_input(format!(
                    "Upload {index} needs a valid '{plot_type_key}'"
                ))
            })?;
        let content = parameters
            .get(&format!("file_{index}"))
            .cloned()
            .unwrap_or_default();
        validate_upload(index, plot_type, &content)?;
        requests.push(UploadRequest {
            index,
            plot_type,
            content,
        });
    }
    Ok(requests)
}

/// Checks an uploaded track file before anything is written to disk.
/// Tile data rows are `accession\tstart\tend` with an optional `id=` column;
/// value plots (line, histogram, heatmap) need a numeric fourth column.
fn validate_upload(index: u32, plot_type: PlotType, content: &str) -> Result<(), CircosError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            CircosError::invalid_input(format!("Upload {index} row {}: {e}", row + 1))
        })?;
        match plot_type {
            PlotType::Tile => match record.len() {
                3 => {}
                4 if record[3].starts_with("id=") => {}
                _ => {
                    return Err(CircosError::invalid_input(format!(
                        "Upload {index} row {} is not tile data (want accession, start, end[, id=...])",
                        row + 1
                    )));
                }
            },
            PlotType::Line | PlotType::Histogram | PlotType::Heatmap => {
                let value = record.get(3).unwrap_or("");
                if value.parse::<f64>().is_err() {
                    return Err(CircosError::invalid_input(format!(
                        "Upload {index} row {} has no numeric value column for a {} plot",
                        row + 1,
                        plot_type.keyword()
                    )));
                }
            }
        }
    }
    Ok(())
}
