//! Page rasterisation: the [`PageRasterizer`] seam and its pdfium-backed
//! implementation.
//!
//! The binarisation core never touches pdfium directly; the preview matrix
//! and the document converter take any `PageRasterizer`, which keeps them
//! testable with synthetic pages.
//!
//! pdfium is not async-safe. The async entry points in [`crate::convert`] and
//! [`crate::preview`] therefore bind, open and render inside
//! `tokio::task::spawn_blocking`.

use crate::error::Pdf2BwError;
use crate::output::DocumentMetadata;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Produces RGBA rasters of a document's pages.
pub trait PageRasterizer {
    /// Number of pages in the source document.
    fn page_count(&self) -> usize;

    /// Render 1-indexed `page_num` at `resolution` dots per inch.
    fn rasterize(&self, page_num: usize, resolution: u32) -> Result<RgbaImage, Pdf2BwError>;
}

impl<T: PageRasterizer + ?Sized> PageRasterizer for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn rasterize(&self, page_num: usize, resolution: u32) -> Result<RgbaImage, Pdf2BwError> {
        (**self).rasterize(page_num, resolution)
    }
}

/// Bind to a pdfium shared library.
///
/// Lookup order: `PDFIUM_LIB_PATH` (path to the library file), a library in
/// the current directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2BwError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        if !path.is_empty() {
            debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
            return Pdfium::bind_to_library(PathBuf::from(&path))
                .map(Pdfium::new)
                .map_err(|e| Pdf2BwError::PdfiumBindingFailed(format!("{path}: {e:?}")));
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from("./"));
    Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Pdf2BwError::PdfiumBindingFailed(format!("{e:?}")))
}

/// Map a pdfium load failure onto the error a user can act on.
fn classify_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2BwError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            Pdf2BwError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2BwError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2BwError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// [`PageRasterizer`] over a PDF opened with pdfium.
pub struct PdfiumRasterizer<'a> {
    document: PdfDocument<'a>,
    page_count: usize,
    max_rendered_pixels: Option<u32>,
}

impl<'a> PdfiumRasterizer<'a> {
    /// Open `pdf_path`, supplying `password` for encrypted documents.
    pub fn open(
        pdfium: &'a Pdfium,
        pdf_path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, Pdf2BwError> {
        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| classify_load_error(pdf_path, password, e))?;

        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);

        Ok(Self {
            document,
            page_count,
            max_rendered_pixels: None,
        })
    }

    /// Cap both edges of every rendered bitmap at `px` pixels.
    pub fn with_max_rendered_pixels(mut self, px: Option<u32>) -> Self {
        self.max_rendered_pixels = px;
        self
    }

    /// Document-level metadata of the opened PDF.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            page_count: self.page_count,
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }
}

impl PageRasterizer for PdfiumRasterizer<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, page_num: usize, resolution: u32) -> Result<RgbaImage, Pdf2BwError> {
        let failed = |detail: String| Pdf2BwError::RasterisationFailed {
            page: page_num,
            resolution,
            detail,
        };

        if page_num == 0 || page_num > self.page_count {
            return Err(Pdf2BwError::PageOutOfRange {
                page: page_num,
                total: self.page_count,
            });
        }

        let page = self
            .document
            .pages()
            .get((page_num - 1) as u16)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let mut render_config =
            PdfRenderConfig::new().scale_page_by_factor(resolution as f32 / POINTS_PER_INCH);
        if let Some(px) = self.max_rendered_pixels {
            render_config = render_config
                .set_maximum_width(px as i32)
                .set_maximum_height(px as i32);
        }

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{:?}", e)))?;

        let image = bitmap.as_image().into_rgba8();
        debug!(
            "Rendered page {} at {} dpi → {}x{} px",
            page_num,
            resolution,
            image.width(),
            image.height()
        );

        Ok(image)
    }
}
