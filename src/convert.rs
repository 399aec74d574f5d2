//! Full-document conversion.
//!
//! [`convert_document`] is the dependency-injected core: it walks every page
//! in order, rasterises it at the configured resolution, binarises it, and
//! hands the result to a [`DocumentAssembler`], reporting progress after each
//! page. The async functions below wire it to pdfium and the PDF assembler.
//!
//! Pages are processed strictly one after another. Each page's raster,
//! luminance field and histogram are dropped before the next page starts.

use crate::config::ConversionConfig;
use crate::error::Pdf2BwError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::assemble::{DocumentAssembler, PdfAssembler};
use crate::pipeline::page::{process_page, OutputMode};
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::input;
use crate::progress::ConversionProgress;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Wall-clock split of a conversion run.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Timings {
    pub render_ms: u64,
    pub processing_ms: u64,
}

/// Convert every page of `rasterizer` with `config.settings` and return the
/// assembler's finished output.
///
/// Progress is reported through `config.progress_callback` exactly once per
/// completed page. `config.cancel` is checked before each page; a cancelled
/// run returns [`Pdf2BwError::Cancelled`] and the partially filled assembler
/// is dropped.
///
/// # Errors
/// The first rasterisation, pipeline or assembly error aborts the run.
pub fn convert_document<R, A>(
    rasterizer: &R,
    assembler: A,
    config: &ConversionConfig,
) -> Result<A::Output, Pdf2BwError>
where
    R: PageRasterizer + ?Sized,
    A: DocumentAssembler,
{
    convert_document_timed(rasterizer, assembler, config).map(|(out, _)| out)
}

pub(crate) fn convert_document_timed<R, A>(
    rasterizer: &R,
    mut assembler: A,
    config: &ConversionConfig,
) -> Result<(A::Output, Timings), Pdf2BwError>
where
    R: PageRasterizer + ?Sized,
    A: DocumentAssembler,
{
    let total = rasterizer.page_count();
    let settings = config.settings;
    let cb = config.progress_callback.as_ref();
    let mut timings = Timings::default();

    info!("Converting {} pages at {}", total, settings);
    if let Some(cb) = cb {
        cb.on_conversion_start(total);
    }

    for page_num in 1..=total {
        if config.cancel.is_cancelled() {
            warn!("Conversion cancelled before page {}", page_num);
            return Err(Pdf2BwError::Cancelled {
                completed: page_num - 1,
                total,
            });
        }

        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }

        if let Err(e) = convert_one(rasterizer, &mut assembler, config, page_num, &mut timings) {
            if let Some(cb) = cb {
                cb.on_page_error(page_num, total, &e.to_string());
            }
            return Err(e);
        }

        if let Some(cb) = cb {
            cb.on_page_complete(ConversionProgress {
                pages_completed: page_num,
                pages_total: total,
            });
        }
    }

    let output = assembler.finish()?;
    if let Some(cb) = cb {
        cb.on_conversion_complete(total);
    }

    Ok((output, timings))
}

fn convert_one<R, A>(
    rasterizer: &R,
    assembler: &mut A,
    config: &ConversionConfig,
    page_num: usize,
    timings: &mut Timings,
) -> Result<(), Pdf2BwError>
where
    R: PageRasterizer + ?Sized,
    A: DocumentAssembler,
{
    let render_start = Instant::now();
    let raster = rasterizer.rasterize(page_num, config.settings.resolution)?;
    timings.render_ms += render_start.elapsed().as_millis() as u64;

    let process_start = Instant::now();
    let page = process_page(raster, page_num, config.settings, OutputMode::Full)?;
    assembler.append_page(page)?;
    timings.processing_ms += process_start.elapsed().as_millis() as u64;

    debug!("Page {} done", page_num);
    Ok(())
}

/// Convert a PDF file to a black-and-white PDF.
///
/// This is the primary entry point for the library. pdfium work runs inside
/// `spawn_blocking` since it is CPU-bound and not async-safe.
///
/// # Errors
/// Returns `Err(Pdf2BwError)` for unreadable input, pdfium failures, any
/// page failure, or cancellation. No partial document is returned.
pub async fn convert(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2BwError> {
    let path = input::resolve_local(input_path)?;
    info!("Starting conversion: {}", path.display());
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_blocking(&path, &config))
        .await
        .map_err(|e| Pdf2BwError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Blocking implementation of [`convert`].
pub(crate) fn convert_blocking(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2BwError> {
    let total_start = Instant::now();
    let pdfium = render::bind_pdfium()?;
    let rasterizer = PdfiumRasterizer::open(&pdfium, pdf_path, config.password.as_deref())?
        .with_max_rendered_pixels(config.max_rendered_pixels);
    let metadata = rasterizer.metadata();

    let title = output_title(pdf_path, config, &metadata);
    let (pdf, timings) =
        convert_document_timed(&rasterizer, PdfAssembler::new(&title), config)?;

    let stats = ConversionStats {
        total_pages: metadata.page_count,
        settings: config.settings,
        render_duration_ms: timings.render_ms,
        processing_duration_ms: timings.processing_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {}ms total",
        stats.total_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf,
        metadata,
        stats,
    })
}

/// Title for the output PDF: explicit config, then the source title, then
/// the file stem.
fn output_title(pdf_path: &Path, config: &ConversionConfig, metadata: &DocumentMetadata) -> String {
    config
        .title
        .clone()
        .or_else(|| metadata.title.clone())
        .unwrap_or_else(|| {
            pdf_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string())
        })
}

/// Default output path next to the input: `report.pdf` → `report_bw.pdf`.
pub fn default_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input_path.with_file_name(format!("{stem}_bw.pdf"))
}

/// Convert a PDF and write the result directly to a file.
///
/// Uses atomic write (temp file + rename) so a failed or cancelled run never
/// leaves a partial file behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2BwError> {
    let output = convert(input_path, config).await?;
    let path = output_path.as_ref();
    write_atomic(path, &output.pdf).await?;
    Ok(output.stats)
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2BwError> {
    let write_err = |e: std::io::Error| Pdf2BwError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    let written = match tokio::fs::write(&tmp_path, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2BwError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2BwError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_path, config))
}

/// Convert PDF bytes held in memory.
///
/// The bytes are written to a managed temporary file, deleted on return.
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2BwError> {
    let tmp = input::spill_to_tempfile(bytes)?;
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(tmp.path(), config).await
}

/// Read PDF metadata without rendering any page.
pub async fn inspect(input_path: impl AsRef<Path>) -> Result<DocumentMetadata, Pdf2BwError> {
    let path = input::resolve_local(input_path)?;
    tokio::task::spawn_blocking(move || {
        let pdfium = render::bind_pdfium()?;
        let rasterizer = PdfiumRasterizer::open(&pdfium, &path, None)?;
        Ok(rasterizer.metadata())
    })
    .await
    .map_err(|e| Pdf2BwError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::page::ProcessedPage;
    use crate::progress::{CancelFlag, ConversionProgressCallback};
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    struct Pages {
        count: usize,
        fail_on: Option<usize>,
        cancel_after: Option<(usize, CancelFlag)>,
        rendered: Mutex<Vec<usize>>,
    }

    impl Pages {
        fn new(count: usize) -> Self {
            Self {
                count,
                fail_on: None,
                cancel_after: None,
                rendered: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageRasterizer for Pages {
        fn page_count(&self) -> usize {
            self.count
        }

        fn rasterize(&self, page_num: usize, resolution: u32) -> Result<RgbaImage, Pdf2BwError> {
            self.rendered.lock().unwrap().push(page_num);
            if self.fail_on == Some(page_num) {
                return Err(Pdf2BwError::RasterisationFailed {
                    page: page_num,
                    resolution,
                    detail: "boom".into(),
                });
            }
            if let Some((n, flag)) = &self.cancel_after {
                if page_num == *n {
                    flag.cancel();
                }
            }
            Ok(RgbaImage::from_pixel(12, 16, Rgba([255, 255, 255, 255])))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ConversionProgress>>,
        errors: Mutex<Vec<usize>>,
        completed: Mutex<Option<usize>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_page_complete(&self, progress: ConversionProgress) {
            self.events.lock().unwrap().push(progress);
        }

        fn on_page_error(&self, page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.lock().unwrap().push(page_num);
        }

        fn on_conversion_complete(&self, total_pages: usize) {
            *self.completed.lock().unwrap() = Some(total_pages);
        }
    }

    fn config_with(recorder: &Arc<Recorder>) -> ConversionConfig {
        ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn progress_is_emitted_once_per_page() {
        let recorder = Arc::new(Recorder::default());
        let pages = Pages::new(5);
        let out: Vec<ProcessedPage> =
            convert_document(&pages, Vec::new(), &config_with(&recorder)).unwrap();

        assert_eq!(out.len(), 5);
        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 5);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.pages_completed, i + 1);
            assert_eq!(e.pages_total, 5);
        }
        assert_eq!(*recorder.completed.lock().unwrap(), Some(5));
    }

    #[test]
    fn pages_are_assembled_in_ascending_order() {
        let pages = Pages::new(4);
        let out = convert_document(&pages, Vec::new(), &ConversionConfig::default()).unwrap();
        let nums: Vec<usize> = out.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3, 4]);
        assert!(out.iter().all(|p| p.resolution == 400));
        assert_eq!(*pages.rendered.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn failure_aborts_at_the_failing_page() {
        let recorder = Arc::new(Recorder::default());
        let mut pages = Pages::new(5);
        pages.fail_on = Some(3);

        let err = convert_document(&pages, Vec::new(), &config_with(&recorder)).unwrap_err();
        assert!(matches!(err, Pdf2BwError::RasterisationFailed { page: 3, .. }));
        assert_eq!(recorder.events.lock().unwrap().len(), 2);
        assert_eq!(*recorder.errors.lock().unwrap(), vec![3]);
        assert_eq!(*recorder.completed.lock().unwrap(), None);
        assert_eq!(*pages.rendered.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn cancellation_stops_at_the_next_page_boundary() {
        let flag = CancelFlag::new();
        let mut pages = Pages::new(6);
        pages.cancel_after = Some((2, flag.clone()));
        let config = ConversionConfig::builder()
            .cancel_flag(flag)
            .build()
            .unwrap();

        let err = convert_document(&pages, Vec::new(), &config).unwrap_err();
        assert!(matches!(
            err,
            Pdf2BwError::Cancelled {
                completed: 2,
                total: 6
            }
        ));
        assert_eq!(*pages.rendered.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn empty_document_emits_no_progress() {
        let recorder = Arc::new(Recorder::default());
        let out = convert_document(&Pages::new(0), Vec::new(), &config_with(&recorder)).unwrap();
        assert!(out.is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn pdf_assembler_output_is_a_pdf() {
        let pdf = convert_document(
            &Pages::new(2),
            PdfAssembler::new("t"),
            &ConversionConfig::default(),
        )
        .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn default_output_path_appends_suffix() {
        assert_eq!(
            default_output_path(Path::new("/docs/report.pdf")),
            PathBuf::from("/docs/report_bw.pdf")
        );
        assert_eq!(
            default_output_path(Path::new("scan.PDF")),
            PathBuf::from("scan_bw.pdf")
        );
    }

    #[test]
    fn title_prefers_config_then_metadata_then_stem() {
        let meta = DocumentMetadata {
            page_count: 1,
            title: Some("Source Title".into()),
            author: None,
            producer: None,
            pdf_version: String::new(),
        };
        let path = Path::new("/a/notes.pdf");
        let explicit = ConversionConfig::builder().title("Mine").build().unwrap();
        assert_eq!(output_title(path, &explicit, &meta), "Mine");
        assert_eq!(
            output_title(path, &ConversionConfig::default(), &meta),
            "Source Title"
        );
        let untitled = DocumentMetadata { title: None, ..meta };
        assert_eq!(
            output_title(path, &ConversionConfig::default(), &untitled),
            "notes"
        );
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.pdf");
        write_atomic(&target, b"%PDF-1.7").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.7");
        assert!(!target.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        // A non-empty directory at the target path makes the rename fail.
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pdf");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        let err = write_atomic(&target, b"%PDF-1.7").await.unwrap_err();
        assert!(matches!(err, Pdf2BwError::OutputWriteFailed { .. }));
        assert!(!target.with_extension("pdf.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[tokio::test]
    async fn convert_rejects_missing_input_before_pdfium() {
        let err = convert("/no/such/file.pdf", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2BwError::FileNotFound { .. }));
    }
}
