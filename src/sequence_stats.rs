use serde::{Deserialize, Serialize};

/// Window size for GC content and GC skew calculations, in bases.
pub const GC_WINDOW_SIZE: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcMetric {
    Content,
    Skew,
}

/// One fixed-size window's derived value (GC content or GC skew).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatWindow {
    pub accession: String,
    pub start_index: usize,
    pub end_index: usize,
    pub value: f64,
}

/// Divides `sequence` into `len / window_size` consecutive windows and
/// computes `metric` for each. Window 0 starts at 0; window i starts at
/// `i * window_size + 1`, so consecutive windows are adjacent rather than
/// overlapping. Every window ends at `min((i + 1) * window_size, len - 1)`.
/// Counting scans the half-open range `[start, end)`.
///
/// GC content divides by the nominal `window_size`, not the actual window
/// length; downstream consumers rely on that denominator. GC skew is
/// `(g - c) / (g + c)`, defined as 0.0 for windows without any G or C.
///
/// A sequence shorter than one window yields no windows.
pub fn compute_window_stats(
    accession: &str,
    sequence: &str,
    window_size: usize,
    metric: GcMetric,
) -> Vec<StatWindow> {
    let bytes = sequence.as_bytes();
    let len = bytes.len();
    if window_size == 0 || len < window_size {
        return vec![];
    }

    let window_count = len / window_size;
    let mut windows = Vec::with_capacity(window_count);
    for i in 0..window_count {
        let start_index = if i == 0 { 0 } else { i * window_size + 1 };
        let end_index = ((i + 1) * window_size).min(len - 1);
        let value = match metric {
            GcMetric::Content => {
                gc_count(&bytes[start_index..end_index]) as f64 / window_size as f64
            }
            GcMetric::Skew => {
                let g = base_count(&bytes[start_index..end_index], b'G');
                let c = base_count(&bytes[start_index..end_index], b'C');
                if g + c == 0 {
                    0.0
                } else {
                    (g as f64 - c as f64) / (g + c) as f64
                }
            }
        };
        windows.push(StatWindow {
            accession: accession.to_string(),
            start_index,
            end_index,
            value,
        });
    }
    windows
}

#[inline(always)]
fn gc_count(window: &[u8]) -> usize {
    window
        .iter()
        .map(|c| c.to_ascii_uppercase())
        .filter(|&c| c == b'G' || c == b'C')
        .count()
}

#[inline(always)]
fn base_count(window: &[u8], base: u8) -> usize {
    window
        .iter()
        .filter(|c| c.to_ascii_uppercase() == base)
        .count()
}
