//! Pipeline stages for black-and-white conversion.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and the rasteriser or output format can change
//! without touching the binarisation math.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ luminance ──▶ threshold ──▶ binarize ──▶ speckle ──▶ encode / assemble
//! (path)    (pdfium)   (Rec.709)     (Otsu)        (stretch +    (3×3       (PNG / PDF)
//!                                                    soft ramp)   cleanup)
//! ```
//!
//! 1. [`input`]     — validate the user-supplied path (exists, readable, `%PDF`)
//! 2. [`render`]    — rasterise a page at a resolution behind the
//!    [`render::PageRasterizer`] trait; pdfium implementation included
//! 3. [`luminance`] — RGBA → per-pixel relative luminance
//! 4. [`threshold`] — 256-bucket histogram, raw min/max, Otsu split
//! 5. [`binarize`]  — contrast stretch, then threshold with a linear blend band
//! 6. [`speckle`]   — whiten isolated black pixels
//! 7. [`page`]      — run 3–6 for one page; full page or zoomed centre crop
//! 8. [`encode`]    — lossless PNG for previews
//! 9. [`assemble`]  — collect pages into the output document
//!
//! Stages 3–6 run to completion on a stable buffer; nothing in them yields.

pub mod assemble;
pub mod binarize;
pub mod encode;
pub mod input;
pub mod luminance;
pub mod page;
pub mod render;
pub mod speckle;
pub mod threshold;
