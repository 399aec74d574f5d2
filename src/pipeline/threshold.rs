//! Histogram construction and Otsu threshold selection.
//!
//! The histogram is built from *raw* luminance; the threshold it yields is
//! later applied to contrast-stretched values (see [`super::binarize`]).
//! That ordering is kept on purpose for output compatibility.

use super::luminance::LuminanceField;
use tracing::{debug, warn};

/// Threshold used when the histogram admits no valid split.
pub const OTSU_FALLBACK: u8 = 128;

/// 256-bucket luminance histogram plus the raw luminance range.
///
/// Invariant: `counts` sums to `total`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: [u64; 256],
    total: u64,
    min: f32,
    max: f32,
}

impl Histogram {
    /// Bucket every luminance value (truncated to an integer in `0..=255`)
    /// and record the min/max in the same pass.
    pub fn from_luminance(field: &LuminanceField) -> Self {
        let mut counts = [0u64; 256];
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for &g in field.values() {
            counts[g.clamp(0.0, 255.0) as usize] += 1;
            min = min.min(g);
            max = max.max(g);
        }

        if field.is_empty() {
            min = 0.0;
            max = 0.0;
        }

        Self {
            counts,
            total: field.len() as u64,
            min,
            max,
        }
    }

    /// Build a histogram directly from bucket counts. The luminance range is
    /// taken from the lowest and highest non-empty bucket.
    pub fn from_counts(counts: [u64; 256]) -> Self {
        let total = counts.iter().sum();
        let min = counts.iter().position(|&c| c > 0).unwrap_or(0) as f32;
        let max = counts.iter().rposition(|&c| c > 0).unwrap_or(0) as f32;
        Self {
            counts,
            total,
            min,
            max,
        }
    }

    pub fn counts(&self) -> &[u64; 256] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Lowest raw luminance observed.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Highest raw luminance observed.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Otsu's variance-maximising split, or `None` when no candidate leaves
    /// pixels on both sides.
    ///
    /// Pixels in buckets `<= t` form the background class. Candidates with an
    /// empty class are excluded rather than scored as zero. When several
    /// adjacent candidates share the maximum (a flat plateau between two
    /// populated buckets) the midpoint of the first such plateau is returned,
    /// which keeps the cut away from either population.
    pub fn otsu(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }

        let total = self.total as f64;
        let weighted_total: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum();

        let mut count_b = 0f64;
        let mut sum_b = 0f64;
        let mut best: Option<(f64, usize, usize)> = None;
        let mut in_run = false;

        for t in 0..256 {
            count_b += self.counts[t] as f64;
            sum_b += t as f64 * self.counts[t] as f64;

            let count_f = total - count_b;
            if count_b == 0.0 || count_f == 0.0 {
                continue;
            }

            let mean_b = sum_b / count_b;
            let mean_f = (weighted_total - sum_b) / count_f;
            let w_b = count_b / total;
            let w_f = count_f / total;
            let variance = w_b * w_f * (mean_b - mean_f).powi(2);

            // Only a contiguous run of tied maxima forms a plateau; a later,
            // separate run of the same score keeps the first one.
            match best {
                Some((v, first, _)) if (variance - v).abs() <= v * 1e-12 => {
                    if in_run {
                        best = Some((v, first, t));
                    }
                }
                Some((v, _, _)) if variance < v => in_run = false,
                _ => {
                    best = Some((variance, t, t));
                    in_run = true;
                }
            }
        }

        best.map(|(_, first, last)| ((first + last) / 2) as u8)
    }

    /// [`Self::otsu`] with the documented fallback for degenerate pages.
    pub fn otsu_or_fallback(&self) -> u8 {
        match self.otsu() {
            Some(t) => {
                debug!(threshold = t, "Otsu threshold");
                t
            }
            None => {
                warn!(
                    fallback = OTSU_FALLBACK,
                    "No valid Otsu split (uniform page); using fallback threshold"
                );
                OTSU_FALLBACK
            }
        }
    }
}

/// Threshold actually applied to the page: `otsu + bias`. Not clamped to
/// `0..=255`; only saturates at the ends of `i32`.
pub fn effective_threshold(otsu: u8, bias: i32) -> i32 {
    bias.saturating_add(otsu as i32)
}
