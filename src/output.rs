//! Result types returned by conversion and preview runs.

use crate::config::ConversionSettings;
use crate::error::Pdf2BwError;
use crate::pipeline::encode::{encode_png, to_data_uri};
use crate::pipeline::page::ProcessedPage;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Document-level metadata read without rendering any page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: String,
}

/// Timing and size figures for a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub settings: ConversionSettings,
    /// Time spent inside the rasteriser.
    pub render_duration_ms: u64,
    /// Time spent binarising pages and appending them to the assembler.
    pub processing_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A fully converted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The assembled black-and-white PDF.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// One cell of the preview matrix.
#[derive(Debug, Clone)]
pub struct PreviewCandidate {
    /// 1-indexed source page the crop was taken from.
    pub page_num: usize,
    pub resolution: u32,
    pub threshold_bias: i32,
    /// Magnified centre crop of the processed page.
    pub image: RgbaImage,
}

impl PreviewCandidate {
    pub(crate) fn from_page(page: ProcessedPage, threshold_bias: i32) -> Self {
        Self {
            page_num: page.page_num,
            resolution: page.resolution,
            threshold_bias,
            image: page.image,
        }
    }

    /// The settings that produced this candidate, ready to feed back into a
    /// full conversion.
    pub fn settings(&self) -> ConversionSettings {
        ConversionSettings::new(self.resolution, self.threshold_bias)
    }

    /// Lossless PNG encoding of the preview crop.
    pub fn to_png(&self) -> Result<Vec<u8>, Pdf2BwError> {
        encode_png(&self.image, self.page_num)
    }

    /// `data:image/png;base64,…` of the preview crop.
    pub fn to_data_uri(&self) -> Result<String, Pdf2BwError> {
        Ok(to_data_uri(&self.to_png()?))
    }

    /// Conventional file name, e.g. `preview_r400_b-25.png`.
    pub fn file_name(&self) -> String {
        format!("preview_r{}_b{}.png", self.resolution, self.threshold_bias)
    }
}
