//! Configuration types for image-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across tasks, logged, and compared between runs.

use crate::error::Img2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default margin between the page edge and the image, in points.
pub const DEFAULT_MARGIN: f64 = 20.0;

/// Default prefix of the suggested output file name.
pub const DEFAULT_FILE_PREFIX: &str = "imagens-convertidas";

/// Configuration for an image-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use img2pdf::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .page_size(PageSize::Letter)
///     .margin(36.0)
///     .file_prefix("scans")
///     .build()
///     .unwrap();
/// assert_eq!(config.page_size.width(), 612.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Size of every output page. Default: [`PageSize::A4`] (595 × 842 pt).
    pub page_size: PageSize,

    /// Blank border kept around each image, in points. Default: 20.
    ///
    /// Must leave a positive usable area: `2 * margin` has to be smaller than
    /// both page dimensions.
    pub margin: f64,

    /// Prefix of the suggested file name. Default: `imagens-convertidas`.
    pub file_prefix: String,

    /// Title stored in the PDF document information dictionary.
    pub document_title: String,

    /// Embed JPEG files as-is (DCT filter) instead of re-encoding pixels.
    /// Default: true.
    ///
    /// Only applies to RGB or greyscale JPEGs with no EXIF rotation; every
    /// other image is decoded to 8-bit RGB.
    pub jpeg_passthrough: bool,

    /// Longest edge of generated thumbnails, in pixels. Default: 96.
    pub thumbnail_max_edge: u32,

    /// Number of inputs fetched concurrently before ingestion. Default: 4.
    ///
    /// Fetch order never affects page order; results are re-sequenced.
    pub fetch_concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            margin: DEFAULT_MARGIN,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            document_title: "Converted images".to_string(),
            jpeg_passthrough: true,
            thumbnail_max_edge: 96,
            fetch_concurrency: 4,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("page_size", &self.page_size)
            .field("margin", &self.margin)
            .field("file_prefix", &self.file_prefix)
            .field("document_title", &self.document_title)
            .field("jpeg_passthrough", &self.jpeg_passthrough)
            .field("thumbnail_max_edge", &self.thumbnail_max_edge)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
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

    /// Usable width inside the margins.
    pub fn max_image_width(&self) -> f64 {
        self.page_size.width() - 2.0 * self.margin
    }

    /// Usable height inside the margins.
    pub fn max_image_height(&self) -> f64 {
        self.page_size.height() - 2.0 * self.margin
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Negative margins clamp to zero; NaN is kept so `build()` rejects it.
    pub fn margin(mut self, margin: f64) -> Self {
        self.config.margin = if margin.is_nan() { margin } else { margin.max(0.0) };
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = title.into();
        self
    }

    pub fn jpeg_passthrough(mut self, v: bool) -> Self {
        self.config.jpeg_passthrough = v;
        self
    }

    pub fn thumbnail_max_edge(mut self, px: u32) -> Self {
        self.config.thumbnail_max_edge = px.clamp(16, 1024);
        self
    }

    pub fn fetch_concurrency(mut self, n: usize) -> Self {
        self.config.fetch_concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Img2PdfError> {
        let c = &self.config;
        let (w, h) = (c.page_size.width(), c.page_size.height());
        if !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            return Err(Img2PdfError::InvalidConfig(format!(
                "page size must be positive, got {w}×{h} pt"
            )));
        }
        if !c.margin.is_finite() || c.margin * 2.0 >= w || c.margin * 2.0 >= h {
            return Err(Img2PdfError::InvalidConfig(format!(
                "margin {} pt leaves no room on a {w}×{h} pt page",
                c.margin
            )));
        }
        if c.file_prefix.trim().is_empty() || c.file_prefix.contains(['/', '\\']) {
            return Err(Img2PdfError::InvalidConfig(format!(
                "file prefix '{}' is not a valid file name",
                c.file_prefix
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output page size, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// ISO A4 portrait, 595 × 842 pt. (default)
    #[default]
    A4,
    /// US Letter portrait, 612 × 792 pt.
    Letter,
    /// US Legal portrait, 612 × 1008 pt.
    Legal,
    /// Any other size.
    Custom { width: f64, height: f64 },
}

impl PageSize {
    pub fn width(&self) -> f64 {
        match self {
            PageSize::A4 => 595.0,
            PageSize::Letter | PageSize::Legal => 612.0,
            PageSize::Custom { width, .. } => *width,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            PageSize::A4 => 842.0,
            PageSize::Letter => 792.0,
            PageSize::Legal => 1008.0,
            PageSize::Custom { height, .. } => *height,
        }
    }

    /// Parse `a4`, `letter`, `legal` or `<W>x<H>` (points).
    pub fn parse(s: &str) -> Option<PageSize> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "a4" => Some(PageSize::A4),
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            other => {
                let (w, h) = other.split_once(['x', '×'])?;
                let width: f64 = w.trim().parse().ok()?;
                let height: f64 = h.trim().parse().ok()?;
                (width > 0.0 && height > 0.0).then_some(PageSize::Custom { width, height })
            }
        }
    }
}
