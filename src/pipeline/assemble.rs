//! Document assembly: the [`DocumentAssembler`] seam and a PDF implementation.
//!
//! The converter calls [`DocumentAssembler::append_page`] once per page in
//! ascending page order and [`DocumentAssembler::finish`] once at the end.
//! Page order in the output follows call order only.

use super::page::ProcessedPage;
use crate::error::Pdf2BwError;
use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

/// Millimetres per inch.
const MM_PER_INCH: f32 = 25.4;

/// Collects processed pages into one output document.
pub trait DocumentAssembler {
    type Output;

    /// Append the next page. Called in ascending page order.
    fn append_page(&mut self, page: ProcessedPage) -> Result<(), Pdf2BwError>;

    /// Finalise the document.
    fn finish(self) -> Result<Self::Output, Pdf2BwError>;
}

/// Keeps the processed rasters as-is.
impl DocumentAssembler for Vec<ProcessedPage> {
    type Output = Vec<ProcessedPage>;

    fn append_page(&mut self, page: ProcessedPage) -> Result<(), Pdf2BwError> {
        self.push(page);
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, Pdf2BwError> {
        Ok(self)
    }
}

/// Builds a PDF with one full-bleed image page per processed page.
///
/// Each PDF page keeps the physical size the page was rendered at
/// (`pixels / resolution` inches), so the output matches the source layout.
pub struct PdfAssembler {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
}

impl PdfAssembler {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl DocumentAssembler for PdfAssembler {
    type Output = Vec<u8>;

    #[instrument(skip(self, page), fields(page = page.page_num))]
    fn append_page(&mut self, page: ProcessedPage) -> Result<(), Pdf2BwError> {
        if page.resolution == 0 {
            return Err(Pdf2BwError::AssemblyFailed(format!(
                "page {} has resolution 0",
                page.page_num
            )));
        }

        let dpi = page.resolution as f32;
        let width = page.image.width() as usize;
        let height = page.image.height() as usize;
        let page_w = Mm(width as f32 / dpi * MM_PER_INCH);
        let page_h = Mm(height as f32 / dpi * MM_PER_INCH);

        let rgb = DynamicImage::ImageRgba8(page.image).into_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width,
            height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.doc.add_image(&raw);

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(1.0),
                scale_y: Some(1.0),
                dpi: Some(dpi),
                rotate: None,
            },
        }];

        self.pages.push(PdfPage::new(page_w, page_h, ops));
        debug!(width_mm = page_w.0, height_mm = page_h.0, "Page placed");
        Ok(())
    }

    fn finish(mut self) -> Result<Self::Output, Pdf2BwError> {
        if self.pages.is_empty() {
            return Err(Pdf2BwError::AssemblyFailed(
                "no pages were appended".into(),
            ));
        }

        let count = self.pages.len();
        self.doc.with_pages(self.pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        info!(pages = count, bytes = output.len(), "Assembled output PDF");
        Ok(output)
    }
}
