use serde::{Deserialize, Serialize};

/// One genomic feature (gene, RNA, ...) as returned by the data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub accession: String,
    pub start: u64,
    pub end: u64,
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    #[inline(always)]
    pub fn symbol(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlotType {
    Tile,
    Line,
    Histogram,
    Heatmap,
}

impl PlotType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "tile" => Some(PlotType::Tile),
            "line" => Some(PlotType::Line),
            "histogram" => Some(PlotType::Histogram),
            "heatmap" => Some(PlotType::Heatmap),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn keyword(&self) -> &'static str {
        match self {
            PlotType::Tile => "tile",
            PlotType::Line => "line",
            PlotType::Histogram => "histogram",
            PlotType::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackKind {
    BuiltinFeature,
    CustomQuery,
    GcContent,
    GcSkew,
    UserUpload {
        file_name: String,
        plot_type: PlotType,
    },
}

/// One data series plotted as a ring segment in the circular diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub records: Vec<FeatureRecord>,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind, records: Vec<FeatureRecord>) -> Self {
        Self {
            name: name.into(),
            kind,
            records,
        }
    }

    /// Synthetic track with no feature records (GC statistics, uploads).
    pub fn synthetic(name: impl Into<String>, kind: TrackKind) -> Self {
        Self::new(name, kind, vec![])
    }

    /// Data file name for this track: underscores become dots,
    /// e.g. `cds_forward` -> `cds.forward.txt`.
    pub fn data_file_name(&self) -> String {
        match &self.kind {
            TrackKind::UserUpload { file_name, .. } => file_name.clone(),
            _ => format!("{}.txt", self.name.replace('_', ".")),
        }
    }
}

/// Insertion-ordered track mapping. Track order drives both color assignment
/// and radial stacking, so iteration must always reproduce insertion order.
/// Re-inserting an existing name replaces the track in place without moving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMap {
    entries: Vec<Track>,
}

impl TrackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: Track) {
        match self.entries.iter_mut().find(|t| t.name == track.name) {
            Some(existing) => *existing = track,
            None => self.entries.push(track),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Track> {
        self.entries.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Track) -> bool) {
        self.entries.retain(keep);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
