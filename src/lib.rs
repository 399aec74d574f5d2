//! # edgequake-pdf2bw
//!
//! Convert PDF documents into clean black-and-white rasters for e-ink
//! readers and low-contrast displays.
//!
//! ## Why this crate?
//!
//! Scanned and photographed pages are rarely pure black on pure white. Grey
//! backgrounds, faded ink and sensor noise all look muddy on a 1-bit or
//! 16-level panel. This crate renders every page, picks a per-page threshold
//! with Otsu's method, stretches contrast, binarises with a narrow soft band
//! to keep glyph edges smooth, and finally removes isolated specks.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate local file (exists, readable, %PDF)
//!  ├─ 2. Render     rasterise page at N dpi via pdfium (spawn_blocking)
//!  ├─ 3. Analyse    Rec.709 luminance → histogram → Otsu threshold + bias
//!  ├─ 4. Binarise   contrast stretch → soft threshold → speckle cleanup
//!  └─ 5. Output     one image page per source page in a new PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2bw::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .resolution(300)
//!         .threshold_bias(10)
//!         .build()?;
//!     let stats = convert_to_file("scan.pdf", "scan_bw.pdf", &config).await?;
//!     eprintln!("{} pages in {}ms", stats.total_pages, stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Choosing settings
//!
//! Call [`preview`] with a page number to get a 3×3 grid of zoomed crops
//! around the current resolution and bias, then feed the chosen
//! [`PreviewCandidate::settings`] back into a full conversion.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2bw` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! edgequake-pdf2bw = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionSettings};
pub use convert::{
    convert, convert_document, convert_from_bytes, convert_sync, convert_to_file,
    default_output_path, inspect,
};
pub use error::Pdf2BwError;
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PreviewCandidate};
pub use pipeline::assemble::{DocumentAssembler, PdfAssembler};
pub use pipeline::page::{process_page, OutputMode, ProcessedPage};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use preview::{generate_preview_matrix, preview};
pub use progress::{
    CancelFlag, ConversionProgress, ConversionProgressCallback, NoopProgressCallback,
    ProgressCallback,
};
pub use stream::{convert_stream, ConversionEvent, ConversionStream};
