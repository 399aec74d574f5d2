//! Luminance extraction: RGBA raster → per-pixel relative luminance.
//!
//! Uses the Rec. 709 / sRGB relative-luminance weights. Alpha is ignored:
//! pdfium renders pages onto an opaque white background, so alpha carries no
//! information about ink.

use image::RgbaImage;

/// Rec. 709 weight of the red channel.
pub const WEIGHT_R: f32 = 0.2126;
/// Rec. 709 weight of the green channel.
pub const WEIGHT_G: f32 = 0.7152;
/// Rec. 709 weight of the blue channel.
pub const WEIGHT_B: f32 = 0.0722;

/// Row-major luminance values, one per pixel, each in `[0.0, 255.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LuminanceField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl LuminanceField {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Luminance of a single RGB triple.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    // The weights sum to 1.0, but f32 rounding can nudge pure white a hair
    // above 255.
    (WEIGHT_R * r as f32 + WEIGHT_G * g as f32 + WEIGHT_B * b as f32).min(255.0)
}

/// Compute the luminance field of `raster` without modifying it.
///
/// An empty raster yields an empty field; the page pipeline rejects empty
/// rasters before calling this.
pub fn extract_luminance(raster: &RgbaImage) -> LuminanceField {
    let values = raster
        .pixels()
        .map(|p| luminance(p[0], p[1], p[2]))
        .collect();

    LuminanceField {
        width: raster.width(),
        height: raster.height(),
        values,
    }
}
