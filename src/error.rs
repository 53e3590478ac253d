//! Error types for the img2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2PdfError`] — **Fatal**: the run cannot produce a document
//!   (empty batch, an image that will not decode, unwritable output).
//!   Returned as `Err(Img2PdfError)` from every top-level entry point.
//!
//! * [`IngestRejection`] — **Non-fatal**: one input was excluded at the
//!   ingestion boundary (not a JPEG/PNG, unreadable path, failed download)
//!   while the remaining inputs were accepted. Reported alongside the
//!   result in [`crate::output::ConversionOutput`].
//!
//! Assembly itself has no partial-success mode: a single decode failure
//! aborts the run and leaves the batch untouched, so the caller can remove
//! the offending image and try again.

use crate::batch::ImageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the img2pdf library.
#[derive(Debug, Error)]
pub enum Img2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was read but is neither a JPEG nor a PNG.
    #[error("Unsupported media type for '{name}': {detected} (only image/jpeg and image/png are accepted)")]
    UnsupportedMediaType { name: String, detected: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Assembly was requested with no images in the batch.
    #[error("No images to convert: add at least one JPEG or PNG image")]
    EmptyBatch,

    /// Inputs were given but every one of them was rejected at ingestion.
    #[error(
        "No images to convert: all {} input(s) were skipped\n{}",
        .rejected.len(),
        list_rejections(.rejected)
    )]
    NothingAccepted { rejected: Vec<IngestRejection> },

    /// One image's pixel content could not be read. Aborts the whole run.
    #[error("Could not decode image '{name}' ({identity}): {detail}")]
    Decode {
        identity: ImageId,
        name: String,
        detail: String,
    },

    /// Any other failure while building pages or serialising the document.
    #[error("PDF assembly failed: {0}")]
    Assembly(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Img2PdfError {
    /// Whether the error concerns a single input that can simply be skipped.
    ///
    /// [`crate::pipeline::input::resolve_all`] uses this to turn per-input
    /// failures into [`IngestRejection`]s instead of aborting.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Img2PdfError::FileNotFound { .. }
                | Img2PdfError::PermissionDenied { .. }
                | Img2PdfError::InvalidInput { .. }
                | Img2PdfError::DownloadFailed { .. }
                | Img2PdfError::DownloadTimeout { .. }
                | Img2PdfError::UnsupportedMediaType { .. }
        )
    }

    /// Inputs skipped before the run failed, if the error carries any.
    pub fn rejections(&self) -> &[IngestRejection] {
        match self {
            Img2PdfError::NothingAccepted { rejected } => rejected,
            _ => &[],
        }
    }
}

fn list_rejections(rejected: &[IngestRejection]) -> String {
    rejected
        .iter()
        .map(|r| format!("  {}: {}", r.input, r.reason.lines().next().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// An input excluded at the ingestion boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{input}: {reason}")]
pub struct IngestRejection {
    /// The path or URL exactly as the caller supplied it.
    pub input: String,
    /// Human-readable reason, taken from the underlying [`Img2PdfError`].
    pub reason: String,
}

impl IngestRejection {
    pub fn new(input: impl Into<String>, err: &Img2PdfError) -> Self {
        Self {
            input: input.into(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_display() {
        let msg = Img2PdfError::EmptyBatch.to_string();
        assert!(msg.contains("at least one"), "got: {msg}");
    }

    #[test]
    fn decode_display_names_the_image() {
        let id = ImageId::new();
        let e = Img2PdfError::Decode {
            identity: id,
            name: "scan-03.png".into(),
            detail: "truncated IDAT".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("scan-03.png"));
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("truncated IDAT"));
    }

    #[test]
    fn unsupported_media_type_display() {
        let e = Img2PdfError::UnsupportedMediaType {
            name: "notes.txt".into(),
            detected: "unknown".into(),
        };
        assert!(e.to_string().contains("notes.txt"));
        assert!(e.to_string().contains("image/png"));
    }

    #[test]
    fn nothing_accepted_lists_every_reason() {
        let gif = Img2PdfError::UnsupportedMediaType {
            name: "a.gif".into(),
            detected: "image/gif".into(),
        };
        let e = Img2PdfError::NothingAccepted {
            rejected: vec![IngestRejection::new("a.gif", &gif)],
        };
        let msg = e.to_string();
        assert!(msg.contains("1 input(s)"), "got: {msg}");
        assert!(msg.contains("a.gif: Unsupported media type"), "got: {msg}");
        assert_eq!(e.rejections().len(), 1);
        assert!(Img2PdfError::EmptyBatch.rejections().is_empty());
    }

    #[test]
    fn input_errors_are_skippable() {
        assert!(Img2PdfError::FileNotFound {
            path: PathBuf::from("/nope.png")
        }
        .is_input_error());
        assert!(!Img2PdfError::EmptyBatch.is_input_error());
        assert!(!Img2PdfError::Assembly("x".into()).is_input_error());
    }

    #[test]
    fn rejection_carries_reason() {
        let err = Img2PdfError::InvalidInput {
            input: "ftp://x".into(),
        };
        let r = IngestRejection::new("ftp://x", &err);
        assert_eq!(r.input, "ftp://x");
        assert!(r.to_string().contains("not a file path"));
    }
}
