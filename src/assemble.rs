//! PDF assembly: one page per batch item, in batch order.
//!
//! ## Per-item steps
//!
//! 1. decode the item's preview handle (intrinsic size + pixels)
//! 2. [`fit_to_page`] with the configured page size and margin
//! 3. start a new page for every item after the first
//! 4. draw the pixels into the placement rectangle
//! 5. report progress `n / total`
//!
//! Items are handled strictly one after another. A failed decode ends the
//! run with [`Img2PdfError::Decode`]; no partial document is produced and
//! nothing is retried.
//!
//! The batch is borrowed immutably for the whole run, so it cannot be
//! edited while a conversion is in flight.

use crate::batch::ImageBatch;
use crate::config::ConversionConfig;
use crate::error::Img2PdfError;
use crate::export;
use crate::layout::fit_to_page;
use crate::output::{ConversionResult, PagePlacement};
use crate::pipeline::canvas::{DocumentCanvas, PdfCanvas};
use crate::pipeline::decode::{ImageCrateDecoder, PreviewDecoder};
use crate::progress::fraction;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns an [`ImageBatch`] into a PDF.
#[derive(Clone)]
pub struct Assembler {
    config: ConversionConfig,
    decoder: Arc<dyn PreviewDecoder>,
}

impl fmt::Debug for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Assembler {
    /// An assembler using [`ImageCrateDecoder`].
    pub fn new(config: ConversionConfig) -> Self {
        let decoder = ImageCrateDecoder {
            jpeg_passthrough: config.jpeg_passthrough,
        };
        Self {
            config,
            decoder: Arc::new(decoder),
        }
    }

    /// Replace the decode facility.
    pub fn with_decoder(mut self, decoder: Arc<dyn PreviewDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Assemble the batch into a PDF and name it.
    pub async fn assemble(&self, batch: &ImageBatch) -> Result<ConversionResult, Img2PdfError> {
        let start = Instant::now();
        let mut canvas = PdfCanvas::new(self.config.page_size, self.config.document_title.as_str());
        let pages = self.assemble_onto(batch, &mut canvas).await?;
        let bytes = canvas.finish().await?;

        info!(
            "Assembled {} pages ({} bytes) in {}ms",
            pages.len(),
            bytes.len(),
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(pages.len(), bytes.len());
        }

        Ok(export::materialize(
            bytes,
            pages,
            &self.config.file_prefix,
            Utc::now(),
        ))
    }

    /// Draw every item of the batch onto `canvas`.
    ///
    /// Returns one [`PagePlacement`] per item. The canvas is expected to be
    /// fresh, i.e. to hold exactly one empty page.
    pub async fn assemble_onto<C: DocumentCanvas>(
        &self,
        batch: &ImageBatch,
        canvas: &mut C,
    ) -> Result<Vec<PagePlacement>, Img2PdfError> {
        if batch.is_empty() {
            return Err(Img2PdfError::EmptyBatch);
        }

        let total = batch.len();
        let cb = self.config.progress_callback.as_ref();
        info!(
            "Assembling {} images on {:?} pages, margin {} pt",
            total, self.config.page_size, self.config.margin
        );
        if let Some(cb) = cb {
            cb.on_conversion_start(total);
        }

        let mut placements = Vec::with_capacity(total);
        for (index, item) in batch.iter().enumerate() {
            let image_num = index + 1;
            if let Some(cb) = cb {
                cb.on_image_start(image_num, total);
            }

            let decoded = match self.decoder.decode(item.preview(), item.media_type()).await {
                Ok(decoded) => decoded,
                Err(detail) => {
                    warn!("Image {}/{} '{}' failed: {}", image_num, total, item.name(), detail);
                    if let Some(cb) = cb {
                        cb.on_image_error(image_num, total, &detail);
                    }
                    return Err(Img2PdfError::Decode {
                        identity: item.id(),
                        name: item.name().to_string(),
                        detail,
                    });
                }
            };

            let layout = fit_to_page(decoded.size, self.config.page_size, self.config.margin);
            if index > 0 {
                canvas.new_page()?;
            }
            canvas.draw_image(decoded.pixels, layout)?;
            debug!(
                "Page {}: '{}' {}×{} → {:.2}×{:.2} at ({:.2}, {:.2})",
                image_num,
                item.name(),
                decoded.size.width(),
                decoded.size.height(),
                layout.width,
                layout.height,
                layout.x,
                layout.y
            );

            placements.push(PagePlacement {
                index,
                image_id: item.id(),
                name: item.name().to_string(),
                intrinsic: decoded.size,
                layout,
            });

            if let Some(cb) = cb {
                cb.on_image_complete(image_num, total, fraction(image_num, total));
            }
        }

        if canvas.page_count() != placements.len() {
            return Err(Img2PdfError::Internal(format!(
                "canvas has {} pages for {} images",
                canvas.page_count(),
                placements.len()
            )));
        }
        Ok(placements)
    }
}

/// Assemble `batch` with the default decoder.
pub async fn assemble(
    batch: &ImageBatch,
    config: &ConversionConfig,
) -> Result<ConversionResult, Img2PdfError> {
    Assembler::new(config.clone()).assemble(batch).await
}
