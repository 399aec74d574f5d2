//! Configuration types for black-and-white conversion.
//!
//! The two numbers a user actually tunes live in [`ConversionSettings`]; they
//! are what the preview matrix varies and what the full conversion applies.
//! Everything else (password, output title, progress reporting, cancellation)
//! hangs off [`ConversionConfig`], built via its [`ConversionConfigBuilder`].

use crate::error::Pdf2BwError;
use crate::progress::{CancelFlag, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rendering resolution in dots per inch.
pub const DEFAULT_RESOLUTION: u32 = 400;

/// Highest resolution accepted by [`ConversionConfigBuilder::build`].
///
/// A letter-size page at 2400 dpi is already ~20 000 × 26 000 px.
pub const MAX_RESOLUTION: u32 = 2400;

/// The user-tunable conversion parameters.
///
/// Immutable for the duration of one pipeline call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Rasterisation density (dots per inch). Must be positive.
    pub resolution: u32,
    /// Signed offset added to the page's Otsu threshold. Not clamped: large
    /// magnitudes deliberately over- or under-expose the page.
    pub threshold_bias: i32,
}

impl ConversionSettings {
    pub fn new(resolution: u32, threshold_bias: i32) -> Self {
        Self {
            resolution,
            threshold_bias,
        }
    }
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold_bias: 0,
        }
    }
}

impl fmt::Display for ConversionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dpi, bias {:+}", self.resolution, self.threshold_bias)
    }
}

/// Configuration for a conversion or preview run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2bw::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .resolution(300)
///     .threshold_bias(-10)
///     .build()
///     .unwrap();
/// assert_eq!(config.settings.resolution, 300);
/// ```
#[derive(Clone, Default)]
pub struct ConversionConfig {
    /// Resolution and threshold bias applied to every page.
    pub settings: ConversionSettings,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional cap on the rendered bitmap's width and height, in pixels.
    ///
    /// When set, pdfium scales the page down so neither edge exceeds the cap,
    /// even if `settings.resolution` asks for more.
    pub max_rendered_pixels: Option<u32>,

    /// Title written into the output PDF. Default: none.
    pub title: Option<String>,

    /// Receives one event per completed page.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between pages; trip it to stop the conversion early.
    pub cancel: CancelFlag,
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("settings", &self.settings)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("title", &self.title)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn settings(mut self, settings: ConversionSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.config.settings.resolution = dpi;
        self
    }

    pub fn threshold_bias(mut self, bias: i32) -> Self {
        self.config.settings.threshold_bias = bias;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = Some(px);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.config.cancel = flag;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2BwError> {
        let c = &self.config;
        if c.settings.resolution == 0 || c.settings.resolution > MAX_RESOLUTION {
            return Err(Pdf2BwError::InvalidConfig(format!(
                "Resolution must be 1–{} dpi, got {}",
                MAX_RESOLUTION, c.settings.resolution
            )));
        }
        if let Some(px) = c.max_rendered_pixels {
            if px < 16 {
                return Err(Pdf2BwError::InvalidConfig(format!(
                    "max_rendered_pixels must be ≥ 16, got {px}"
                )));
            }
        }
        Ok(self.config)
    }
}
