//! Error types for the edgequake-pdf2bw library.
//!
//! There is a single fatal error type, [`Pdf2BwError`]. Numerical edge cases
//! inside the binarization stages (uniform pages, histograms with no valid
//! Otsu split) are *not* errors: they are recovered locally with documented
//! fallbacks and never surface here.
//!
//! Every other failure terminates the batch it occurred in. A conversion or
//! preview run either yields a complete, numerically valid result or an
//! `Err`, never a silently substituted page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2bw library.
#[derive(Debug, Error)]
pub enum Pdf2BwError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Requested page number is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── PDF / rasterisation errors ────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The rasteriser failed for a specific page at a specific resolution.
    #[error("Rasterisation failed for page {page} at {resolution} dpi: {detail}")]
    RasterisationFailed {
        page: usize,
        resolution: u32,
        detail: String,
    },

    /// The rasteriser returned a bitmap with no pixels.
    #[error("Page {page} rendered to an empty bitmap")]
    EmptyPage { page: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// A processed page could not be encoded as an image.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    /// The document assembler rejected a page or failed to finalise.
    #[error("Document assembly failed: {0}")]
    AssemblyFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Control flow ──────────────────────────────────────────────────────
    /// The caller tripped the cancel flag between two pages.
    #[error("Conversion cancelled after {completed}/{total} pages")]
    Cancelled { completed: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install pdfium system-wide (libpdfium on your library path).\n\
  • Place libpdfium next to the working directory.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2BwError {
    /// `true` when the error was raised by the cancel flag rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Pdf2BwError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = Pdf2BwError::PageOutOfRange { page: 7, total: 3 };
        let msg = e.to_string();
        assert!(msg.contains("Page 7"), "got: {msg}");
        assert!(msg.contains("3 pages"), "got: {msg}");
    }

    #[test]
    fn rasterisation_failed_display() {
        let e = Pdf2BwError::RasterisationFailed {
            page: 2,
            resolution: 300,
            detail: "bitmap alloc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"));
        assert!(msg.contains("300 dpi"));
        assert!(msg.contains("bitmap alloc"));
    }

    #[test]
    fn cancelled_display_and_predicate() {
        let e = Pdf2BwError::Cancelled {
            completed: 4,
            total: 10,
        };
        assert!(e.to_string().contains("4/10"));
        assert!(e.is_cancelled());
        assert!(!Pdf2BwError::Internal("x".into()).is_cancelled());
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Pdf2BwError::OutputWriteFailed {
            path: PathBuf::from("/tmp/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("disk full"));
    }
}
