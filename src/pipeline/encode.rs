//! Image encoding: processed raster → PNG bytes (and a data-URI for hosts
//! that display previews inline).
//!
//! PNG is lossless, so every intensity written by the binariser and the
//! speckle filter survives encoding exactly.

use crate::error::Pdf2BwError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a processed page as PNG.
pub fn encode_png(img: &RgbaImage, page_num: usize) -> Result<Vec<u8>, Pdf2BwError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Pdf2BwError::EncodingFailed {
            page: page_num,
            detail: e.to_string(),
        })?;

    debug!(
        page = page_num,
        width = img.width(),
        height = img.height(),
        bytes = buf.len(),
        "Encoded PNG"
    );
    Ok(buf)
}

/// Wrap PNG bytes as a `data:image/png;base64,…` URI.
pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
