//! Preview matrix: render one page under a 3×3 grid of settings around the
//! user's current choice so they can pick the best-looking combination
//! before committing to a full conversion.
//!
//! ```text
//!                 bias−25     bias      bias+25
//! resolution−100    ·          ·          ·
//! resolution        ·          ·          ·
//! resolution+100    ·          ·          ·
//! ```
//!
//! Rows with a non-positive resolution are dropped. Cells are produced in
//! resolution-major, bias-minor order, and any single failure aborts the
//! whole batch: a partial matrix would hide exactly the combination the
//! user may have wanted to compare against.

use crate::config::{ConversionConfig, ConversionSettings};
use crate::error::Pdf2BwError;
use crate::output::PreviewCandidate;
use crate::pipeline::input;
use crate::pipeline::page::{process_page, OutputMode};
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Resolution delta between neighbouring grid rows.
pub const RESOLUTION_STEP: i64 = 100;
/// Bias delta between neighbouring grid columns.
pub const BIAS_STEP: i32 = 25;

/// Grid rows: `resolution − 100, resolution, resolution + 100`, keeping only
/// positive values.
pub fn preview_resolutions(resolution: u32) -> Vec<u32> {
    let r = resolution as i64;
    [r - RESOLUTION_STEP, r, r + RESOLUTION_STEP]
        .into_iter()
        .filter(|&v| v > 0)
        .filter_map(|v| u32::try_from(v).ok())
        .collect()
}

/// Grid columns: `bias − 25, bias, bias + 25`.
pub fn preview_biases(bias: i32) -> [i32; 3] {
    [
        bias.saturating_sub(BIAS_STEP),
        bias,
        bias.saturating_add(BIAS_STEP),
    ]
}

/// Every grid cell in resolution-major, bias-minor order. Not deduplicated.
pub fn preview_grid(settings: ConversionSettings) -> Vec<ConversionSettings> {
    let biases = preview_biases(settings.threshold_bias);
    preview_resolutions(settings.resolution)
        .into_iter()
        .flat_map(|r| biases.iter().map(move |&b| ConversionSettings::new(r, b)))
        .collect()
}

/// Build the preview matrix for 1-indexed `page_num`.
///
/// # Errors
/// - [`Pdf2BwError::PageOutOfRange`] before any rendering when `page_num` is
///   outside `1..=page_count`.
/// - The first rasterisation or pipeline error, discarding finished cells.
pub fn generate_preview_matrix<R: PageRasterizer + ?Sized>(
    rasterizer: &R,
    settings: ConversionSettings,
    page_num: usize,
) -> Result<Vec<PreviewCandidate>, Pdf2BwError> {
    let total = rasterizer.page_count();
    if page_num == 0 || page_num > total {
        return Err(Pdf2BwError::PageOutOfRange {
            page: page_num,
            total,
        });
    }

    let grid = preview_grid(settings);
    info!(
        "Generating {} preview candidates for page {} around {}",
        grid.len(),
        page_num,
        settings
    );

    let mut candidates = Vec::with_capacity(grid.len());
    for cell in grid {
        let raster = rasterizer.rasterize(page_num, cell.resolution)?;
        let page = process_page(raster, page_num, cell, OutputMode::Preview)?;
        debug!(
            resolution = cell.resolution,
            bias = cell.threshold_bias,
            threshold = page.stats.effective_threshold,
            "Preview cell ready"
        );
        candidates.push(PreviewCandidate::from_page(page, cell.threshold_bias));
    }

    Ok(candidates)
}

/// Open a PDF with pdfium and build the preview matrix for `page_num` around
/// `config.settings`.
///
/// Rendering runs inside `spawn_blocking` since pdfium operations are
/// CPU-bound and not async-safe.
pub async fn preview(
    input_path: impl AsRef<Path>,
    page_num: usize,
    config: &ConversionConfig,
) -> Result<Vec<PreviewCandidate>, Pdf2BwError> {
    let start = Instant::now();
    let path = input::resolve_local(input_path)?;
    let config = config.clone();

    let candidates = tokio::task::spawn_blocking(move || {
        let pdfium = render::bind_pdfium()?;
        let rasterizer = PdfiumRasterizer::open(&pdfium, &path, config.password.as_deref())?
            .with_max_rendered_pixels(config.max_rendered_pixels);
        generate_preview_matrix(&rasterizer, config.settings, page_num)
    })
    .await
    .map_err(|e| Pdf2BwError::Internal(format!("Preview task panicked: {}", e)))??;

    info!(
        "Preview matrix ready: {} candidates in {}ms",
        candidates.len(),
        start.elapsed().as_millis()
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    /// Grey page with a dark bar; records every render request.
    struct Recording {
        pages: usize,
        calls: Mutex<Vec<(usize, u32)>>,
        fail_at: Option<u32>,
    }

    impl Recording {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                calls: Mutex::new(Vec::new()),
                fail_at: None,
            }
        }
    }

    impl PageRasterizer for Recording {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn rasterize(&self, page_num: usize, resolution: u32) -> Result<RgbaImage, Pdf2BwError> {
            self.calls.lock().unwrap().push((page_num, resolution));
            if self.fail_at == Some(resolution) {
                return Err(Pdf2BwError::RasterisationFailed {
                    page: page_num,
                    resolution,
                    detail: "synthetic failure".into(),
                });
            }
            let side = resolution / 10;
            Ok(RgbaImage::from_fn(side, side, |x, _| {
                if x < side / 3 {
                    Rgba([30, 30, 30, 255])
                } else {
                    Rgba([230, 230, 230, 255])
                }
            }))
        }
    }

    #[test]
    fn default_grid_is_three_by_three() {
        assert_eq!(preview_resolutions(400), vec![300, 400, 500]);
        assert_eq!(preview_biases(0), [-25, 0, 25]);

        let grid = preview_grid(ConversionSettings::new(400, 0));
        let cells: Vec<(u32, i32)> = grid.iter().map(|s| (s.resolution, s.threshold_bias)).collect();
        assert_eq!(
            cells,
            vec![
                (300, -25),
                (300, 0),
                (300, 25),
                (400, -25),
                (400, 0),
                (400, 25),
                (500, -25),
                (500, 0),
                (500, 25),
            ]
        );
    }

    #[test]
    fn non_positive_resolutions_are_dropped() {
        assert_eq!(preview_resolutions(50), vec![50, 150]);
        assert_eq!(preview_resolutions(100), vec![100, 200]);
        assert_eq!(preview_grid(ConversionSettings::new(50, 0)).len(), 6);
    }

    #[test]
    fn extreme_bias_does_not_overflow() {
        assert_eq!(preview_biases(i32::MAX)[2], i32::MAX);
        assert_eq!(preview_biases(i32::MIN)[0], i32::MIN);
    }

    #[test]
    fn matrix_renders_each_cell_in_grid_order() {
        let r = Recording::new(3);
        let candidates = generate_preview_matrix(&r, ConversionSettings::new(400, 0), 2).unwrap();
        assert_eq!(candidates.len(), 9);
        assert!(candidates.iter().all(|c| c.page_num == 2));

        let order: Vec<(u32, i32)> = candidates
            .iter()
            .map(|c| (c.resolution, c.threshold_bias))
            .collect();
        assert_eq!(order[0], (300, -25));
        assert_eq!(order[4], (400, 0));
        assert_eq!(order[8], (500, 25));

        let calls = r.calls.lock().unwrap();
        assert_eq!(calls.len(), 9);
        assert!(calls.iter().all(|&(p, _)| p == 2));
    }

    #[test]
    fn candidates_are_zoomed_crops() {
        let r = Recording::new(1);
        let candidates = generate_preview_matrix(&r, ConversionSettings::new(400, 0), 1).unwrap();
        // 40×40 page → 32×20 crop → 40×25 after 1.25× zoom.
        let c = &candidates[4];
        assert_eq!(c.resolution, 400);
        assert_eq!(c.image.dimensions(), (40, 25));
    }

    #[test]
    fn out_of_range_page_fails_before_rendering() {
        let r = Recording::new(2);
        for bad in [0, 3] {
            let err = generate_preview_matrix(&r, ConversionSettings::default(), bad).unwrap_err();
            assert!(matches!(err, Pdf2BwError::PageOutOfRange { total: 2, .. }));
        }
        assert!(r.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn single_failure_aborts_the_batch() {
        let mut r = Recording::new(1);
        r.fail_at = Some(400);
        let err = generate_preview_matrix(&r, ConversionSettings::new(400, 0), 1).unwrap_err();
        assert!(matches!(
            err,
            Pdf2BwError::RasterisationFailed {
                resolution: 400,
                ..
            }
        ));
        // Three 300-dpi cells plus the failing 400-dpi one.
        assert_eq!(r.calls.lock().unwrap().len(), 4);
    }
}
