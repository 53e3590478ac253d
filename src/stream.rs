//! Progress as a `Stream`: receive conversion events asynchronously.
//!
//! [`ConversionProgressCallback`] is push-based and synchronous. Front-ends
//! built around an event loop usually prefer to pull events instead;
//! [`ChannelProgress`] bridges the two by forwarding every callback as a
//! [`ProgressEvent`] through an unbounded tokio channel.
//!
//! Events keep the assembler's order, so `ImageCompleted { fraction }` values arrive
//! non-decreasing and `Finished` is always last on success.

use crate::config::ConversionConfig;
use crate::convert::convert;
use crate::error::Img2PdfError;
use crate::output::ConversionOutput;
use crate::progress::ConversionProgressCallback;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::info;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { total_images: usize },
    ImageStarted { image_num: usize, total_images: usize },
    ImageCompleted { image_num: usize, total_images: usize, fraction: f64 },
    ImageFailed { image_num: usize, total_images: usize, error: String },
    Finished { total_pages: usize, output_bytes: usize },
}

/// A boxed stream of progress events.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Callback that forwards events to a channel.
///
/// Sending never blocks; events are dropped silently once the receiving
/// stream is gone.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create the callback and the stream it feeds.
    pub fn channel() -> (Self, ProgressStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ConversionProgressCallback for ChannelProgress {
    fn on_conversion_start(&self, total_images: usize) {
        self.send(ProgressEvent::Started { total_images });
    }

    fn on_image_start(&self, image_num: usize, total_images: usize) {
        self.send(ProgressEvent::ImageStarted {
            image_num,
            total_images,
        });
    }

    fn on_image_complete(&self, image_num: usize, total_images: usize, fraction: f64) {
        self.send(ProgressEvent::ImageCompleted {
            image_num,
            total_images,
            fraction,
        });
    }

    fn on_image_error(&self, image_num: usize, total_images: usize, error: &str) {
        self.send(ProgressEvent::ImageFailed {
            image_num,
            total_images,
            error: error.to_string(),
        });
    }

    fn on_conversion_complete(&self, total_pages: usize, output_bytes: usize) {
        self.send(ProgressEvent::Finished {
            total_pages,
            output_bytes,
        });
    }
}

/// Run [`convert`] in the background and stream its progress.
///
/// Any callback already set on `config` is replaced. The stream ends when the
/// conversion task finishes; await the handle for the result.
pub fn convert_stream(
    inputs: Vec<String>,
    config: &ConversionConfig,
) -> (
    ProgressStream,
    JoinHandle<Result<ConversionOutput, Img2PdfError>>,
) {
    let (progress, stream) = ChannelProgress::channel();
    let mut config = config.clone();
    config.progress_callback = Some(Arc::new(progress));
    info!("Starting streamed conversion of {} inputs", inputs.len());

    let handle = tokio::spawn(async move { convert(&inputs[..], &config).await });
    (stream, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn callbacks_arrive_in_order() {
        let (progress, stream) = ChannelProgress::channel();
        progress.on_conversion_start(2);
        progress.on_image_start(1, 2);
        progress.on_image_complete(1, 2, 0.5);
        progress.on_image_start(2, 2);
        progress.on_image_complete(2, 2, 1.0);
        progress.on_conversion_complete(2, 1234);
        drop(progress);

        let events: Vec<ProgressEvent> = stream.collect().await;
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], ProgressEvent::Started { total_images: 2 });
        assert_eq!(
            events[5],
            ProgressEvent::Finished {
                total_pages: 2,
                output_bytes: 1234
            }
        );
    }

    #[tokio::test]
    async fn sending_after_the_stream_is_dropped_is_harmless() {
        let (progress, stream) = ChannelProgress::channel();
        drop(stream);
        progress.on_image_error(1, 1, "boom");
    }

    #[test]
    fn events_serialise_with_a_tag() {
        let json = serde_json::to_value(ProgressEvent::ImageCompleted {
            image_num: 1,
            total_images: 4,
            fraction: 0.25,
        })
        .unwrap();
        assert_eq!(json["event"], "image_completed");
        assert_eq!(json["fraction"], 0.25);
    }

    #[tokio::test]
    async fn convert_stream_reports_empty_input_as_error() {
        let (stream, handle) = convert_stream(Vec::new(), &ConversionConfig::default());
        let events: Vec<ProgressEvent> = stream.collect().await;
        assert!(events.is_empty());
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Img2PdfError::EmptyBatch));
    }
}
