//! Single-page orchestration: luminance → Otsu → stretch → binarise →
//! speckle cleanup, plus the zoomed centre crop used for previews.

use super::binarize::{binarize, ContrastStretch};
use super::luminance::extract_luminance;
use super::speckle::remove_speckles;
use super::threshold::{effective_threshold, Histogram};
use crate::config::ConversionSettings;
use crate::error::Pdf2BwError;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

/// Share of the page area covered by a preview crop.
pub const PREVIEW_AREA_RATIO: f64 = 0.4;
/// Width / height of a preview crop.
pub const PREVIEW_ASPECT: f64 = 1.6;
/// Nearest-neighbour magnification applied to a preview crop.
pub const PREVIEW_ZOOM: f64 = 1.25;

/// What the page pipeline hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The whole processed page.
    Full,
    /// Only the magnified centre crop.
    Preview,
}

/// Per-page numbers observed while binarising, kept for logging and stats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageStats {
    /// Otsu threshold on raw luminance (fallback applied).
    pub otsu_threshold: u8,
    /// `otsu_threshold + threshold_bias`.
    pub effective_threshold: i32,
    pub luminance_min: f32,
    pub luminance_max: f32,
    /// Pixels whitened by the speckle filter.
    pub speckles_removed: usize,
}

/// A page that went through the whole stage chain.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Resolution the page was rasterised at.
    pub resolution: u32,
    pub mode: OutputMode,
    pub image: RgbaImage,
    pub stats: PageStats,
}

/// Run the binarisation stages over `raster` in place.
///
/// Takes the raster by value and returns it, so a page buffer has exactly one
/// owner at every step.
pub fn binarize_raster(
    mut raster: RgbaImage,
    threshold_bias: i32,
) -> (RgbaImage, PageStats) {
    let field = extract_luminance(&raster);
    let hist = Histogram::from_luminance(&field);
    let otsu = hist.otsu_or_fallback();
    let t = effective_threshold(otsu, threshold_bias);
    let stretch = ContrastStretch::from_histogram(&hist);

    binarize(&mut raster, &field, stretch, t);
    drop(field);
    let speckles_removed = remove_speckles(&mut raster);

    let stats = PageStats {
        otsu_threshold: otsu,
        effective_threshold: t,
        luminance_min: hist.min(),
        luminance_max: hist.max(),
        speckles_removed,
    };
    (raster, stats)
}

/// Process one rasterised page.
///
/// # Errors
/// [`Pdf2BwError::EmptyPage`] when `raster` has no pixels.
pub fn process_page(
    raster: RgbaImage,
    page_num: usize,
    settings: ConversionSettings,
    mode: OutputMode,
) -> Result<ProcessedPage, Pdf2BwError> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(Pdf2BwError::EmptyPage { page: page_num });
    }

    let (processed, stats) = binarize_raster(raster, settings.threshold_bias);
    debug!(
        page = page_num,
        resolution = settings.resolution,
        otsu = stats.otsu_threshold,
        threshold = stats.effective_threshold,
        lum_min = stats.luminance_min,
        lum_max = stats.luminance_max,
        speckles = stats.speckles_removed,
        "Binarised page"
    );

    let image = match mode {
        OutputMode::Full => processed,
        OutputMode::Preview => preview_crop(&processed),
    };

    Ok(ProcessedPage {
        page_num,
        resolution: settings.resolution,
        mode,
        image,
        stats,
    })
}

/// Pixel rectangle `(x, y, width, height)`.
pub type CropRect = (u32, u32, u32, u32);

/// Centred crop with [`PREVIEW_AREA_RATIO`] of the page area and aspect
/// [`PREVIEW_ASPECT`].
///
/// On a page wider than the target aspect the height is derived first;
/// otherwise the width is. Both are clamped to the page.
pub fn preview_crop_rect(width: u32, height: u32) -> CropRect {
    let (w, h) = (width as f64, height as f64);
    let area = w * h * PREVIEW_AREA_RATIO;

    let (crop_w, crop_h) = if w / h > PREVIEW_ASPECT {
        let crop_h = (area / PREVIEW_ASPECT).sqrt().min(h);
        ((crop_h * PREVIEW_ASPECT).min(w), crop_h)
    } else {
        let crop_w = (area * PREVIEW_ASPECT).sqrt().min(w);
        (crop_w, (crop_w / PREVIEW_ASPECT).min(h))
    };

    let crop_w = (crop_w.round() as u32).clamp(1, width.max(1));
    let crop_h = (crop_h.round() as u32).clamp(1, height.max(1));
    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;
    (x, y, crop_w, crop_h)
}

/// Cut the centre crop out of a processed page and magnify it by
/// [`PREVIEW_ZOOM`] with nearest-neighbour sampling, so individual output
/// pixels stay visible.
pub fn preview_crop(page: &RgbaImage) -> RgbaImage {
    let (x, y, w, h) = preview_crop_rect(page.width(), page.height());
    let crop = imageops::crop_imm(page, x, y, w, h).to_image();

    let zoom_w = ((w as f64 * PREVIEW_ZOOM).round() as u32).max(1);
    let zoom_h = ((h as f64 * PREVIEW_ZOOM).round() as u32).max(1);
    imageops::resize(&crop, zoom_w, zoom_h, FilterType::Nearest)
}
