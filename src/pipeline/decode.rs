//! Decoding: preview handle → intrinsic size + drawable pixels.
//!
//! Decoding is CPU-bound and the `image` codecs are synchronous, so
//! [`ImageCrateDecoder`] runs every decode inside
//! `tokio::task::spawn_blocking`. The assembler awaits each decode before
//! drawing the page, which keeps page order and progress order identical to
//! batch order.
//!
//! JPEGs that need no colour conversion and carry no EXIF rotation are not
//! decoded at all beyond their header: the original bytes are embedded with
//! the DCT filter. Everything else becomes 8-bit RGB with alpha flattened
//! onto white.

use crate::layout::ImageSize;
use crate::pipeline::input::MediaType;
use crate::preview::PreviewHandle;
use futures::future::BoxFuture;
use image::metadata::Orientation;
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::io::Cursor;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// How [`PageImage::data`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    /// Raw 8-bit RGB samples, row-major, no padding.
    Rgb8,
    /// An untouched baseline/progressive JPEG with three components.
    JpegRgb,
    /// An untouched JPEG with one (grey) component.
    JpegGray,
}

/// Pixel content ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width_px: u32,
    pub height_px: u32,
    pub encoding: PixelEncoding,
    pub data: PixelData,
}

/// Sample bytes of a [`PageImage`].
#[derive(Debug, Clone)]
pub enum PixelData {
    /// The source file, shared with the batch item (JPEG pass-through).
    Shared(Arc<[u8]>),
    /// Decoded samples owned by the page.
    Owned(Vec<u8>),
}

impl PixelData {
    /// Take the bytes, copying only when they are shared.
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            PixelData::Shared(bytes) => bytes.to_vec(),
            PixelData::Owned(bytes) => bytes,
        }
    }
}

impl Deref for PixelData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            PixelData::Shared(bytes) => bytes,
            PixelData::Owned(bytes) => bytes,
        }
    }
}

/// Result of decoding one image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Intrinsic size after EXIF orientation, used for layout.
    pub size: ImageSize,
    pub pixels: PageImage,
}

/// The decode facility used by the assembler.
///
/// Implementations return a `'static` future so the work can be moved onto
/// another thread; the error string becomes the `detail` of
/// [`crate::error::Img2PdfError::Decode`].
pub trait PreviewDecoder: Send + Sync {
    fn decode(
        &self,
        handle: &PreviewHandle,
        media_type: MediaType,
    ) -> BoxFuture<'static, Result<DecodedImage, String>>;
}

/// Default decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateDecoder {
    pub jpeg_passthrough: bool,
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self {
            jpeg_passthrough: true,
        }
    }
}

impl PreviewDecoder for ImageCrateDecoder {
    fn decode(
        &self,
        handle: &PreviewHandle,
        media_type: MediaType,
    ) -> BoxFuture<'static, Result<DecodedImage, String>> {
        let bytes = handle.bytes();
        let uri = handle.uri();
        let passthrough = self.jpeg_passthrough;
        Box::pin(async move {
            let bytes = bytes.ok_or_else(|| format!("{uri} is no longer available"))?;
            tokio::task::spawn_blocking(move || decode_blocking(&bytes, media_type, passthrough))
                .await
                .map_err(|e| format!("decode task panicked: {e}"))?
        })
    }
}

/// Blocking implementation of [`ImageCrateDecoder::decode`].
pub fn decode_blocking(
    bytes: &Arc<[u8]>,
    media_type: MediaType,
    jpeg_passthrough: bool,
) -> Result<DecodedImage, String> {
    let mut reader = ImageReader::new(Cursor::new(&bytes[..]));
    reader.set_format(media_type.image_format());
    let mut decoder = reader.into_decoder().map_err(|e| e.to_string())?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();

    if jpeg_passthrough && media_type == MediaType::Jpeg && orientation == Orientation::NoTransforms {
        let encoding = match color {
            ColorType::Rgb8 => Some(PixelEncoding::JpegRgb),
            ColorType::L8 => Some(PixelEncoding::JpegGray),
            _ => None,
        };
        if let Some(encoding) = encoding {
            let size = ImageSize::from_pixels(width, height)
                .ok_or_else(|| format!("invalid dimensions {width}×{height}"))?;
            debug!("JPEG pass-through {}×{} ({:?})", width, height, encoding);
            return Ok(DecodedImage {
                size,
                pixels: PageImage {
                    width_px: width,
                    height_px: height,
                    encoding,
                    data: PixelData::Shared(Arc::clone(bytes)),
                },
            });
        }
    }

    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| e.to_string())?;
    image.apply_orientation(orientation);

    let rgb = flatten_to_rgb(&image);
    let (width, height) = rgb.dimensions();
    let size = ImageSize::from_pixels(width, height)
        .ok_or_else(|| format!("invalid dimensions {width}×{height}"))?;
    debug!("Decoded {}×{} {:?} → RGB8", width, height, color);

    Ok(DecodedImage {
        size,
        pixels: PageImage {
            width_px: width,
            height_px: height,
            encoding: PixelEncoding::Rgb8,
            data: PixelData::Owned(rgb.into_raw()),
        },
    })
}

/// Drop alpha by compositing onto a white background.
fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        dst.0 = [blend(r), blend(g), blend(b)];
    }
    out
}
