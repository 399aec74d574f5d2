//! Contrast normalisation and soft binarisation.
//!
//! Each pixel's raw luminance is stretched to fill `[0, 255]` using the
//! page's observed range, then mapped through a threshold with a linear
//! ramp of half-width [`SOFTNESS`] so glyph edges stay anti-aliased.

use super::luminance::LuminanceField;
use super::threshold::Histogram;
use image::RgbaImage;

/// Half-width of the linear blend band around the threshold.
pub const SOFTNESS: i32 = 18;

/// Linear stretch of the raw luminance range onto `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastStretch {
    min: f32,
    max: f32,
}

impl ContrastStretch {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn from_histogram(hist: &Histogram) -> Self {
        Self::new(hist.min(), hist.max())
    }

    /// `true` when the page has a single luminance value.
    pub fn is_flat(&self) -> bool {
        self.max <= self.min
    }

    /// Stretch one raw luminance value.
    ///
    /// A flat page passes through unchanged: stretching it would map every
    /// pixel to 0 and turn a blank white page black. Narrow but non-zero
    /// ranges use a denominator floored at 1.
    #[inline]
    pub fn apply(&self, g: f32) -> f32 {
        if self.is_flat() {
            return g.clamp(0.0, 255.0);
        }
        let range = (self.max - self.min).max(1.0);
        ((g - self.min) * 255.0 / range).clamp(0.0, 255.0)
    }
}

/// Map normalised luminance `g` to an output intensity for threshold `t`.
///
/// Above `t + SOFTNESS` is white, below `t - SOFTNESS` is black, and the band
/// in between ramps linearly, so `g == t` lands on 128.
#[inline]
pub fn soft_threshold(g: f32, t: i32) -> u8 {
    let lo = (t as i64 - SOFTNESS as i64) as f32;
    let hi = (t as i64 + SOFTNESS as i64) as f32;
    if g > hi {
        255
    } else if g < lo {
        0
    } else {
        let ramp = (g - lo) / (2 * SOFTNESS) as f32;
        (ramp * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

/// Overwrite the RGB channels of `raster` with the binarised intensity.
/// Alpha is left alone.
///
/// `field` must have been extracted from `raster`.
pub fn binarize(raster: &mut RgbaImage, field: &LuminanceField, stretch: ContrastStretch, t: i32) {
    debug_assert_eq!(field.len() as u64, raster.width() as u64 * raster.height() as u64);

    for (pixel, &g) in raster.pixels_mut().zip(field.values()) {
        let v = soft_threshold(stretch.apply(g), t);
        pixel[0] = v;
        pixel[1] = v;
        pixel[2] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::luminance::extract_luminance;
    use image::Rgba;

    #[test]
    fn full_range_stretch_is_identity() {
        let s = ContrastStretch::new(0.0, 255.0);
        for g in [0.0f32, 1.0, 64.5, 128.0, 200.25, 255.0] {
            assert!((s.apply(g) - g).abs() < 1e-3, "{g} → {}", s.apply(g));
        }
    }

    #[test]
    fn narrow_range_is_stretched_to_full_scale() {
        let s = ContrastStretch::new(50.0, 150.0);
        assert_eq!(s.apply(50.0), 0.0);
        assert_eq!(s.apply(150.0), 255.0);
        assert!((s.apply(100.0) - 127.5).abs() < 1e-3);
    }

    #[test]
    fn flat_page_does_not_divide_by_zero() {
        let s = ContrastStretch::new(77.0, 77.0);
        assert!(s.is_flat());
        let out = s.apply(77.0);
        assert!(out.is_finite());
        assert_eq!(out, s.apply(77.0));
    }

    #[test]
    fn sub_unit_range_uses_floor_of_one() {
        let s = ContrastStretch::new(100.0, 100.5);
        assert!(!s.is_flat());
        assert!((s.apply(100.5) - 127.5).abs() < 1e-3);
    }

    #[test]
    fn threshold_maps_to_mid_ramp() {
        let v = soft_threshold(128.0, 128);
        assert!(v == 127 || v == 128, "got {v}");
    }

    #[test]
    fn band_edges_map_to_extremes() {
        assert_eq!(soft_threshold(146.0, 128), 255);
        assert_eq!(soft_threshold(110.0, 128), 0);
    }

    #[test]
    fn values_beyond_band_clamp_and_are_idempotent() {
        let t = 100;
        for g in [0.0f32, 50.0, 81.9, 118.1, 200.0, 255.0] {
            let once = soft_threshold(g, t);
            assert!(once == 0 || once == 255, "{g} → {once}");
            assert_eq!(soft_threshold(once as f32, t), once);
        }
    }

    #[test]
    fn ramp_is_monotonic() {
        let mut prev = 0u8;
        for i in 0..=255 {
            let v = soft_threshold(i as f32, 128);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn extreme_thresholds_saturate() {
        assert_eq!(soft_threshold(0.0, -100), 255);
        assert_eq!(soft_threshold(255.0, 400), 0);
        assert_eq!(soft_threshold(255.0, i32::MAX), 0);
        assert_eq!(soft_threshold(0.0, i32::MIN), 255);
    }

    #[test]
    fn binarize_writes_equal_rgb_and_keeps_alpha() {
        let mut img = RgbaImage::from_fn(8, 1, |x, _| {
            let v = (x * 32) as u8;
            Rgba([v, v / 2, 255 - v, 99])
        });
        let field = extract_luminance(&img);
        binarize(&mut img, &field, ContrastStretch::new(0.0, 255.0), 128);
        for p in img.pixels() {
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
            assert_eq!(p[3], 99);
        }
    }
}
