use crate::error::CircosError;
use crate::params::JobConfig;
use crate::track::{PlotType, TrackKind, TrackMap};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The track color rotation, consumed front-to-back exactly once per
/// qualifying track and never replenished within a job.
pub const TRACK_COLORS: [&str; 11] = [
    "vdblue", "vdgreen", "lgreen", "vdred", "lred", "vdpurple", "lpurple", "vdorange", "lorange",
    "vdyellow", "lyellow",
];

/// Diverging scale used for every heatmap plot instead of a palette color.
pub const HEATMAP_COLOR: &str = "rdbu-10-div";

#[derive(Debug, Default)]
pub struct ColorPalette {
    next: usize,
}

impl ColorPalette {
    pub fn take(&mut self, track: &str) -> Result<&'static str, CircosError> {
        let color = TRACK_COLORS.get(self.next).ok_or_else(|| {
            CircosError::layout(format!(
                "color palette exhausted at track '{track}' ({} colors available)",
                TRACK_COLORS.len()
            ))
        })?;
        self.next += 1;
        Ok(color)
    }

    /// Skips one color without assigning it. Keeps color/track correspondence
    /// identical whether or not the outer track is drawn.
    pub fn discard(&mut self) {
        self.next += 1;
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        TRACK_COLORS.len().saturating_sub(self.next)
    }
}

/// One plot stanza of the final configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    pub file: PathBuf,
    pub plot_type: PlotType,
    pub color: String,
    pub r0: f32,
    pub r1: f32,
    pub thickness: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub extend_bin: bool,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub tile_plots: Vec<PlotSpec>,
    pub non_tile_plots: Vec<PlotSpec>,
}

/// Walks the tracks in mapping order and assigns each a color and a
/// non-overlapping radius band, classifying every plot as tile or non-tile.
///
/// The walk starts at the outer edge (radius 1.0) and works inward. Each
/// track consumes a gap then a band; tile tracks take a narrower band than
/// line/histogram tracks. Identical inputs always produce identical specs.
pub fn plan_layout(
    tracks: &TrackMap,
    config: &JobConfig,
    data_dir: &Path,
) -> Result<Layout, CircosError> {
    let mut layout = Layout::default();
    let mut palette = ColorPalette::default();
    let mut current_radius: f32 = 1.0;
    let track_thickness = config.image_size as f32 * config.track_width;
    let track_buffer = config.track_width - 0.03;

    if config.include_outer_track {
        let r1 = current_radius;
        current_radius -= 0.02;
        let r0 = current_radius;
        layout.tile_plots.push(PlotSpec {
            file: data_dir.join("large.tiles.txt"),
            plot_type: PlotType::Tile,
            color: palette.take("outer_track")?.to_string(),
            r0,
            r1,
            thickness: Some(track_thickness / 2.0),
            min: None,
            max: None,
            extend_bin: false,
            background_color: None,
        });
    } else {
        palette.discard();
    }

    for track in tracks.iter() {
        let file = data_dir.join(track.data_file_name());
        match &track.kind {
            TrackKind::UserUpload { plot_type, .. } => match plot_type {
                PlotType::Tile | PlotType::Heatmap => {
                    let spec = tile_spec(
                        &mut palette,
                        &mut current_radius,
                        track_thickness,
                        track_buffer,
                        &track.name,
                        file,
                        *plot_type,
                    )?;
                    layout.tile_plots.push(spec);
                }
                other => {
                    let spec = value_spec(
                        &mut palette,
                        &mut current_radius,
                        track_buffer,
                        &track.name,
                        file,
                        *other,
                        0.0,
                    )?;
                    layout.non_tile_plots.push(spec);
                }
            },
            TrackKind::GcContent | TrackKind::GcSkew => {
                let plot_type = match track.kind {
                    TrackKind::GcContent => config.gc_content_plot_type,
                    _ => config.gc_skew_plot_type,
                }
                .ok_or_else(|| {
                    CircosError::internal(format!(
                        "Track '{}' registered without a plot type",
                        track.name
                    ))
                })?;
                if plot_type == PlotType::Heatmap {
                    let spec = tile_spec(
                        &mut palette,
                        &mut current_radius,
                        track_thickness,
                        track_buffer,
                        &track.name,
                        file,
                        PlotType::Heatmap,
                    )?;
                    layout.tile_plots.push(spec);
                } else {
                    let min = if track.kind == TrackKind::GcSkew {
                        -1.0
                    } else {
                        0.0
                    };
                    let spec = value_spec(
                        &mut palette,
                        &mut current_radius,
                        track_buffer,
                        &track.name,
                        file,
                        plot_type,
                        min,
                    )?;
                    layout.non_tile_plots.push(spec);
                }
            }
            TrackKind::BuiltinFeature | TrackKind::CustomQuery => {
                let spec = tile_spec(
                    &mut palette,
                    &mut current_radius,
                    track_thickness,
                    track_buffer,
                    &track.name,
                    file,
                    PlotType::Tile,
                )?;
                layout.tile_plots.push(spec);
            }
        }
    }

    Ok(layout)
}

/// Two sequential decrements carve one ring: a gap down to `r1`, then the
/// band itself down to `r0`.
fn consume_band(
    current_radius: &mut f32,
    gap: f32,
    band: f32,
    track: &str,
) -> Result<(f32, f32), CircosError> {
    *current_radius -= gap;
    let r1 = *current_radius;
    *current_radius -= band;
    let r0 = *current_radius;
    if r0 < 0.0 {
        return Err(CircosError::layout(format!(
            "radial layout overflow at track '{track}' (r0 = {r0:.3}); too many tracks for one image"
        )));
    }
    if r1 <= r0 {
        return Err(CircosError::layout(format!(
            "degenerate radial band at track '{track}' (r0 = {r0:.3}, r1 = {r1:.3})"
        )));
    }
    Ok((r0, r1))
}

fn tile_spec(
    palette: &mut ColorPalette,
    current_radius: &mut f32,
    track_thickness: f32,
    track_buffer: f32,
    track: &str,
    file: PathBuf,
    plot_type: PlotType,
) -> Result<PlotSpec, CircosError> {
    let color = if plot_type == PlotType::Heatmap {
        HEATMAP_COLOR.to_string()
    } else {
        palette.take(track)?.to_string()
    };
    let (r0, r1) = consume_band(current_radius, 0.01 + track_buffer, 0.04 + track_buffer, track)?;
    Ok(PlotSpec {
        file,
        plot_type,
        color,
        r0,
        r1,
        thickness: Some(track_thickness),
        min: None,
        max: None,
        extend_bin: false,
        background_color: None,
    })
}

fn value_spec(
    palette: &mut ColorPalette,
    current_radius: &mut f32,
    track_buffer: f32,
    track: &str,
    file: PathBuf,
    plot_type: PlotType,
    min: f32,
) -> Result<PlotSpec, CircosError> {
    let color = palette.take(track)?.to_string();
    let (r0, r1) = consume_band(current_radius, 0.01 + track_buffer, 0.10 + track_buffer, track)?;
    Ok(PlotSpec {
        file,
        plot_type,
        color: color.clone(),
        r0,
        r1,
        thickness: None,
        min: Some(min),
        max: Some(1.0),
        extend_bin: plot_type == PlotType::Histogram,
        background_color: Some(background_color(&color)),
    })
}

/// Plot background: the line color with its shade prefix stripped and a
/// very-light prefix applied, e.g. `vdblue` -> `vvlblue`.
fn background_color(color: &str) -> String {
    let base = color.trim_start_matches(['v', 'l', 'd']);
    format!("vvl{base}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::parse_parameters;
    use crate::track::Track;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> JobConfig {
        let mut parameters: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        parameters.insert("gid".to_string(), "83332.12".to_string());
        parse_parameters(&parameters).unwrap()
    }

    fn feature_tracks(names: &[&str]) -> TrackMap {
        let mut tracks = TrackMap::new();
        for name in names {
            tracks.insert(Track::new(*name, TrackKind::BuiltinFeature, vec![]));
        }
        tracks
    }

    fn data_dir() -> PathBuf {
        PathBuf::from("/tmp/job/data")
    }

    #[test]
    fn test_single_tile_track_without_outer_track() {
        let tracks = feature_tracks(&["cds_forward"]);
        let layout = plan_layout(&tracks, &config(&[("cds_forward", "on")]), &data_dir()).unwrap();

        assert_eq!(layout.tile_plots.len(), 1);
        assert!(layout.non_tile_plots.is_empty());

        let spec = &layout.tile_plots[0];
        // One color is discarded for the absent outer track, so the first
        // real track gets the second palette color.
        assert_eq!(spec.color, "vdgreen");
        assert_eq!(spec.thickness, Some(30.0));
        assert!((spec.r1 - 0.99).abs() < 1e-6);
        assert!((spec.r0 - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_outer_track_alone() {
        let tracks = TrackMap::new();
        let layout = plan_layout(&tracks, &config(&[("include_outer_track", "on")]), &data_dir())
            .unwrap();

        assert_eq!(layout.tile_plots.len(), 1);
        let spec = &layout.tile_plots[0];
        assert_eq!(spec.color, "vdblue");
        assert_eq!(spec.thickness, Some(15.0));
        assert!((spec.r1 - 1.0).abs() < 1e-6);
        assert!((spec.r0 - 0.98).abs() < 1e-6);
        assert!(spec.file.ends_with("large.tiles.txt"));
    }

    #[test]
    fn test_gc_content_line_plot() {
        let mut tracks = TrackMap::new();
        tracks.insert(Track::synthetic("gc_content", TrackKind::GcContent));
        let layout = plan_layout(
            &tracks,
            &config(&[("gc_content_plot_type", "line")]),
            &data_dir(),
        )
        .unwrap();

        assert!(layout.tile_plots.is_empty());
        assert_eq!(layout.non_tile_plots.len(), 1);
        let spec = &layout.non_tile_plots[0];
        assert_eq!(spec.min, Some(0.0));
        assert_eq!(spec.max, Some(1.0));
        assert!(!spec.extend_bin);
        assert_eq!(spec.background_color.as_deref(), Some("vvlgreen"));
        assert!(spec.file.ends_with("gc.content.txt"));
    }

    #[test]
    fn test_gc_skew_histogram_gets_negative_min_and_extend_bin() {
        let mut tracks = TrackMap::new();
        tracks.insert(Track::synthetic("gc_skew", TrackKind::GcSkew));
        let layout = plan_layout(
            &tracks,
            &config(&[("gc_skew_plot_type", "histogram")]),
            &data_dir(),
        )
        .unwrap();

        let spec = &layout.non_tile_plots[0];
        assert_eq!(spec.min, Some(-1.0));
        assert_eq!(spec.max, Some(1.0));
        assert!(spec.extend_bin);
    }

    #[test]
    fn test_gc_heatmap_joins_tile_bucket_without_consuming_a_color() {
        let mut tracks = feature_tracks(&["cds_forward"]);
        tracks.insert(Track::synthetic("gc_content", TrackKind::GcContent));
        tracks.insert(Track::new("custom_track_1", TrackKind::CustomQuery, vec![]));
        let layout = plan_layout(
            &tracks,
            &config(&[
                ("cds_forward", "on"),
                ("gc_content_plot_type", "heatmap"),
                ("custom_track_type_1", "CDS"),
            ]),
            &data_dir(),
        )
        .unwrap();

        assert_eq!(layout.tile_plots.len(), 3);
        assert_eq!(layout.tile_plots[0].color, "vdgreen");
        assert_eq!(layout.tile_plots[1].color, HEATMAP_COLOR);
        // The heatmap skipped the palette, so the custom track takes the
        // third color.
        assert_eq!(layout.tile_plots[2].color, "lgreen");
    }

    #[test]
    fn test_upload_plot_classification() {
        let mut tracks = TrackMap::new();
        tracks.insert(Track::synthetic(
            "user_upload_1",
            TrackKind::UserUpload {
                file_name: "user.upload.1.txt".to_string(),
                plot_type: PlotType::Tile,
            },
        ));
        tracks.insert(Track::synthetic(
            "user_upload_2",
            TrackKind::UserUpload {
                file_name: "user.upload.2.txt".to_string(),
                plot_type: PlotType::Histogram,
            },
        ));
        let layout = plan_layout(&tracks, &config(&[]), &data_dir()).unwrap();

        assert_eq!(layout.tile_plots.len(), 1);
        assert_eq!(layout.non_tile_plots.len(), 1);
        assert!(layout.tile_plots[0].file.ends_with("user.upload.1.txt"));
        let histogram = &layout.non_tile_plots[0];
        assert!(histogram.extend_bin);
        assert_eq!(histogram.min, Some(0.0));
        assert_eq!(histogram.thickness, None);
    }

    #[test]
    fn test_every_band_is_ordered_and_non_negative() {
        let mut tracks = feature_tracks(&["cds_forward", "cds_reverse", "rna_forward"]);
        tracks.insert(Track::synthetic("gc_skew", TrackKind::GcSkew));
        let layout = plan_layout(
            &tracks,
            &config(&[
                ("cds_forward", "on"),
                ("cds_reverse", "on"),
                ("rna_forward", "on"),
                ("gc_skew_plot_type", "line"),
                ("include_outer_track", "on"),
            ]),
            &data_dir(),
        )
        .unwrap();

        for spec in layout.tile_plots.iter().chain(&layout.non_tile_plots) {
            assert!(spec.r1 > spec.r0, "bad band in {spec:?}");
            assert!(spec.r0 >= 0.0, "negative band in {spec:?}");
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let tracks = feature_tracks(&["cds_forward", "misc_reverse"]);
        let config = config(&[("cds_forward", "on"), ("misc_reverse", "on")]);
        let first = plan_layout(&tracks, &config, &data_dir()).unwrap();
        let second = plan_layout(&tracks, &config, &data_dir()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_palette_exhaustion_is_a_named_error() {
        // 11 tile tracks after the unconditional discard exceed the palette.
        let names: Vec<String> = (0..11).map(|i| format!("custom_track_{i}")).collect();
        let mut tracks = TrackMap::new();
        for name in &names {
            tracks.insert(Track::new(name.clone(), TrackKind::CustomQuery, vec![]));
        }
        let err = plan_layout(&tracks, &config(&[]), &data_dir()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Layout);
        assert!(err.message.contains("palette exhausted"));
        assert!(err.message.contains("custom_track_10"));
    }

    #[test]
    fn test_radius_overflow_is_a_named_error() {
        // Wide tracks burn 0.21 of radius each; the fifth one crosses zero.
        let tracks = feature_tracks(&["cds_forward", "cds_reverse", "rna_forward", "rna_reverse", "misc_forward"]);
        let err = plan_layout(
            &tracks,
            &config(&[
                ("cds_forward", "on"),
                ("cds_reverse", "on"),
                ("rna_forward", "on"),
                ("rna_reverse", "on"),
                ("misc_forward", "on"),
                ("track_width", "11"),
            ]),
            &data_dir(),
        )
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Layout);
        assert!(err.message.contains("overflow"));
    }
}
