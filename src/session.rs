//! Long-lived conversion state for interactive front-ends.
//!
//! A [`ConverterSession`] owns one [`ImageBatch`] and at most one
//! [`ConversionResult`]. Converting again replaces the previous result;
//! clearing the batch discards it as well, so a stale download can never be
//! offered for a batch that no longer exists.

use crate::assemble::Assembler;
use crate::batch::{ImageBatch, ImageId};
use crate::config::ConversionConfig;
use crate::error::Img2PdfError;
use crate::output::ConversionResult;
use crate::pipeline::decode::PreviewDecoder;
use crate::pipeline::encode;
use crate::pipeline::input::SourceFile;
use crate::preview::PreviewRegistry;
use std::sync::Arc;
use tracing::debug;

/// A batch plus its latest conversion.
#[derive(Debug)]
pub struct ConverterSession {
    batch: ImageBatch,
    assembler: Assembler,
    latest: Option<ConversionResult>,
}

impl ConverterSession {
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_registry(config, PreviewRegistry::global())
    }

    /// A session whose preview handles live in `registry`.
    pub fn with_registry(config: ConversionConfig, registry: PreviewRegistry) -> Self {
        Self {
            batch: ImageBatch::with_registry(registry),
            assembler: Assembler::new(config),
            latest: None,
        }
    }

    /// Replace the decode facility used by [`convert`](Self::convert).
    pub fn with_decoder(mut self, decoder: Arc<dyn PreviewDecoder>) -> Self {
        self.assembler = self.assembler.with_decoder(decoder);
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        self.assembler.config()
    }

    pub fn batch(&self) -> &ImageBatch {
        &self.batch
    }

    pub fn ingest<I>(&mut self, files: I) -> Vec<ImageId>
    where
        I: IntoIterator<Item = SourceFile>,
    {
        self.batch.ingest(files)
    }

    pub fn remove(&mut self, id: ImageId) -> bool {
        self.batch.remove(id)
    }

    /// Empty the batch and drop the latest result.
    pub fn clear(&mut self) {
        self.batch.clear();
        if self.latest.take().is_some() {
            debug!("Discarded previous result");
        }
    }

    /// Assemble the current batch. On success the new result replaces the
    /// previous one; on failure the previous result is kept.
    pub async fn convert(&mut self) -> Result<&ConversionResult, Img2PdfError> {
        let result = self.assembler.assemble(&self.batch).await?;
        if let Some(old) = self.latest.replace(result) {
            debug!("Superseded {}", old.file_name());
            old.release();
        }
        self.latest
            .as_ref()
            .ok_or_else(|| Img2PdfError::Internal("result vanished".into()))
    }

    pub fn latest_result(&self) -> Option<&ConversionResult> {
        self.latest.as_ref()
    }

    /// Hand the latest result to the caller, leaving none behind.
    pub fn take_result(&mut self) -> Option<ConversionResult> {
        self.latest.take()
    }

    /// Thumbnail of a staged image as a PNG data URI.
    pub fn thumbnail(&self, id: ImageId) -> Option<Result<String, Img2PdfError>> {
        let item = self.batch.get(id)?;
        let max_edge = self.config().thumbnail_max_edge;
        Some(
            encode::thumbnail_data_uri(item.preview(), max_edge).map_err(|e| {
                Img2PdfError::Decode {
                    identity: item.id(),
                    name: item.name().to_string(),
                    detail: e.to_string(),
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> SourceFile {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([9, 9, 9])))
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        SourceFile::from_bytes(format!("{width}x{height}.png"), buf).unwrap()
    }

    fn session() -> (ConverterSession, PreviewRegistry) {
        let registry = PreviewRegistry::new();
        let s = ConverterSession::with_registry(ConversionConfig::default(), registry.clone());
        (s, registry)
    }

    #[tokio::test]
    async fn convert_then_clear_discards_result() {
        let (mut s, registry) = session();
        s.ingest([png(10, 10), png(20, 5)]);
        assert_eq!(s.convert().await.unwrap().page_count(), 2);
        assert!(s.latest_result().is_some());

        s.clear();
        assert!(s.latest_result().is_none());
        assert!(s.batch().is_empty());
        assert_eq!(registry.stats().live, 0);
    }

    #[tokio::test]
    async fn new_conversion_supersedes_previous() {
        let (mut s, _registry) = session();
        let ids = s.ingest([png(10, 10), png(12, 12)]);
        s.convert().await.unwrap();

        assert!(s.remove(ids[0]));
        let second = s.convert().await.unwrap();
        assert_eq!(second.page_count(), 1);
        assert_eq!(second.pages()[0].image_id, ids[1]);
    }

    #[tokio::test]
    async fn failed_conversion_keeps_previous_result() {
        let (mut s, _registry) = session();
        let ids = s.ingest([png(4, 4)]);
        s.convert().await.unwrap();

        s.remove(ids[0]);
        let err = s.convert().await.unwrap_err();
        assert!(matches!(err, Img2PdfError::EmptyBatch));
        assert_eq!(s.latest_result().map(|r| r.page_count()), Some(1));
    }

    #[test]
    fn thumbnail_for_known_and_unknown_ids() {
        let (mut s, _registry) = session();
        let id = s.ingest([png(200, 100)])[0];
        let uri = s.thumbnail(id).unwrap().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(s.thumbnail(ImageId::new()).is_none());
    }
}
