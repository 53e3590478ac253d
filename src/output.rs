//! Output types returned by the conversion entry points.

use crate::batch::ImageId;
use crate::error::{Img2PdfError, IngestRejection};
use crate::layout::{ImageSize, PageLayout};
use crate::pipeline::input::MediaType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where one batch item ended up in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// 0-based page index; equals the item's position in the batch.
    pub index: usize,
    pub image_id: ImageId,
    pub name: String,
    /// Size of the image after EXIF orientation, in pixels.
    pub intrinsic: ImageSize,
    /// Placement rectangle on the page, in points.
    pub layout: PageLayout,
}

/// A finished document: PDF bytes plus the name to save them under.
///
/// Owns the byte buffer. Dropping the value (or calling
/// [`release`](Self::release)) frees it.
#[derive(Serialize)]
pub struct ConversionResult {
    #[serde(skip)]
    bytes: Vec<u8>,
    file_name: String,
    pages: Vec<PagePlacement>,
    created_at: DateTime<Utc>,
}

impl fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionResult")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("file_name", &self.file_name)
            .field("pages", &self.pages.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl ConversionResult {
    pub(crate) fn new(
        bytes: Vec<u8>,
        file_name: String,
        pages: Vec<PagePlacement>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bytes,
            file_name,
            pages,
            created_at,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Suggested download name, e.g. `imagens-convertidas-2024-03-05T14-07-09.pdf`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PagePlacement] {
        &self.pages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Take the bytes out, consuming the result.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Free the byte buffer now.
    pub fn release(self) {
        drop(self);
    }

    /// Write the PDF to `path` atomically.
    ///
    /// The bytes go to a temporary file in the same directory first, which is
    /// then renamed over `path`, so readers never see a half-written PDF.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<PathBuf, Img2PdfError> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| Img2PdfError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(write_err)?;

        let bytes = self.bytes.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".img2pdf-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| Img2PdfError::Internal(format!("write task panicked: {e}")))?
        .map_err(write_err)?;

        info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }

    /// Write the PDF into `dir` under [`file_name`](Self::file_name).
    pub async fn save_in_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Img2PdfError> {
        self.save_to(dir.as_ref().join(&self.file_name)).await
    }
}

/// Counters and timings of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Inputs supplied by the caller.
    pub total_inputs: usize,
    /// Inputs that became batch items.
    pub accepted_images: usize,
    /// Inputs excluded at the ingestion boundary.
    pub rejected_inputs: usize,
    /// Pages in the document (always equal to `accepted_images`).
    pub pages: usize,
    /// Size of the PDF in bytes.
    pub output_bytes: usize,
    /// Time spent reading and downloading inputs.
    pub fetch_duration_ms: u64,
    /// Time spent decoding, laying out and serialising.
    pub assembly_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything [`crate::convert::convert`] returns.
#[derive(Debug, Serialize)]
pub struct ConversionOutput {
    pub result: ConversionResult,
    /// Inputs that were skipped, in input order.
    pub rejected: Vec<IngestRejection>,
    pub stats: ConversionStats,
}

/// Facts about one accepted input, gathered without producing a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub name: String,
    pub media_type: MediaType,
    pub size_bytes: usize,
    /// e.g. `"1.5 MB"`.
    pub formatted_size: String,
    /// Pixel width after EXIF orientation.
    pub width: u32,
    /// Pixel height after EXIF orientation.
    pub height: u32,
    /// `data:image/png;base64,...` thumbnail.
    pub thumbnail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> ConversionResult {
        ConversionResult::new(b"%PDF-1.3\n%%EOF".to_vec(), name.into(), Vec::new(), Utc::now())
    }

    #[tokio::test]
    async fn save_in_dir_uses_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let r = result("scans-2024-01-01T00-00-00.pdf");
        let path = r.save_in_dir(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("scans-2024-01-01T00-00-00.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), r.bytes());
    }

    #[tokio::test]
    async fn save_to_creates_parents_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out/doc.pdf");
        result("ignored.pdf").save_to(&target).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, [std::ffi::OsString::from("doc.pdf")]);
    }

    #[tokio::test]
    async fn save_to_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.pdf");
        std::fs::write(&target, b"old").unwrap();
        result("doc.pdf").save_to(&target).await.unwrap();
        assert!(std::fs::read(&target).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn debug_hides_the_byte_buffer() {
        let dbg = format!("{:?}", result("a.pdf"));
        assert!(dbg.contains("<14 bytes>"), "got {dbg}");
    }

    #[test]
    fn summary_serialises_without_bytes() {
        let json = serde_json::to_value(result("a.pdf")).unwrap();
        assert_eq!(json["file_name"], "a.pdf");
        assert!(json.get("bytes").is_none());
    }
}
