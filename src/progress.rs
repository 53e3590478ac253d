//! Progress-callback trait for per-image conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the assembler places each image. Events arrive strictly in
//! batch order: the assembler decodes and draws one image at a time, so the
//! reported fraction never decreases and reaches `1.0` only after the last
//! page has been drawn.
//!
//! # Example
//!
//! ```rust
//! use img2pdf::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct Percent(Mutex<Vec<u32>>);
//!
//! impl ConversionProgressCallback for Percent {
//!     fn on_image_complete(&self, _n: usize, _total: usize, fraction: f64) {
//!         self.0.lock().unwrap().push((fraction * 100.0).round() as u32);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Percent(Mutex::new(Vec::new()))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the assembler as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// config that carries them is shared across tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first image is decoded.
    fn on_conversion_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called before an image is decoded.
    ///
    /// # Arguments
    /// * `image_num`    — 1-indexed position in the batch
    /// * `total_images` — batch size
    fn on_image_start(&self, image_num: usize, total_images: usize) {
        let _ = (image_num, total_images);
    }

    /// Called once the image has been drawn on its page.
    ///
    /// # Arguments
    /// * `image_num`    — 1-indexed position in the batch
    /// * `total_images` — batch size
    /// * `fraction`     — `image_num / total_images`
    fn on_image_complete(&self, image_num: usize, total_images: usize, fraction: f64) {
        let _ = (image_num, total_images, fraction);
    }

    /// Called when an image fails; the run aborts right after.
    fn on_image_error(&self, image_num: usize, total_images: usize, error: &str) {
        let _ = (image_num, total_images, error);
    }

    /// Called once the document has been serialised.
    ///
    /// # Arguments
    /// * `total_pages`  — pages in the finished document
    /// * `output_bytes` — size of the PDF byte stream
    fn on_conversion_complete(&self, total_pages: usize, output_bytes: usize) {
        let _ = (total_pages, output_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Progress fraction after `completed` of `total` images.
pub(crate) fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 || completed >= total {
        1.0
    } else {
        completed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        starts: AtomicUsize,
        errors: AtomicUsize,
        fractions: Mutex<Vec<f64>>,
        total_bytes: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_image_start(&self, _n: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _n: usize, _total: usize, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }

        fn on_image_error(&self, _n: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _pages: usize, output_bytes: usize) {
            self.total_bytes.store(output_bytes, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_image_start(1, 2);
        cb.on_image_complete(1, 2, 0.5);
        cb.on_image_error(2, 2, "bad pixels");
        cb.on_conversion_complete(2, 1024);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            fractions: Mutex::new(Vec::new()),
            total_bytes: AtomicUsize::new(0),
        };

        for n in 1..=3 {
            tracker.on_image_start(n, 3);
            tracker.on_image_complete(n, 3, fraction(n, 3));
        }
        tracker.on_conversion_complete(3, 4096);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.total_bytes.load(Ordering::SeqCst), 4096);
        let fractions = tracker.fractions.lock().unwrap();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
    }

    #[test]
    fn fraction_is_exact_at_the_end() {
        assert_eq!(fraction(1, 3), 1.0 / 3.0);
        assert_eq!(fraction(3, 3), 1.0);
        assert_eq!(fraction(0, 0), 1.0);
    }
}
