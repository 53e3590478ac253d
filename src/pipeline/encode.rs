//! Thumbnail encoding: preview handle → small base64 PNG data URI.
//!
//! The list view next to each staged image shows a thumbnail, not the full
//! image. Thumbnails are PNG so transparency survives, and they are never
//! larger than the source: an image already inside the bounding box is
//! encoded at its own size.

use crate::preview::PreviewHandle;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::error::{ImageError, ImageResult};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Encode a thumbnail whose longest edge is at most `max_edge` pixels.
pub fn thumbnail_png(bytes: &[u8], max_edge: u32) -> ImageResult<Vec<u8>> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    let max_edge = max_edge.max(1);
    if img.width() > max_edge || img.height() > max_edge {
        img = img.thumbnail(max_edge, max_edge);
    }

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Thumbnail of the handle's image as a `data:image/png;base64,...` URI.
pub fn thumbnail_data_uri(handle: &PreviewHandle, max_edge: u32) -> ImageResult<String> {
    let bytes = handle.bytes().ok_or_else(|| {
        ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has been released", handle.uri()),
        ))
    })?;
    let uri = png_data_uri(&thumbnail_png(&bytes, max_edge)?);
    debug!("Thumbnail for {} → {} chars", handle.uri(), uri.len());
    Ok(uri)
}

/// Wrap PNG bytes in a `data:` URI.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
