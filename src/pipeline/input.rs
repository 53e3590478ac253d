//! Input resolution: turn user-supplied paths or URLs into accepted image files.
//!
//! This is the ingestion boundary. Only JPEG and PNG files get through; the
//! media type is sniffed from the magic bytes and the extension is consulted
//! only when the content is not recognisable. Everything downstream (batch,
//! decoder, canvas) can rely on [`SourceFile::media_type`] being one of the
//! two supported types.

use crate::config::ConversionConfig;
use crate::error::{Img2PdfError, IngestRejection};
use futures::stream::{self, StreamExt};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The two accepted raster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            MediaType::Jpeg => ImageFormat::Jpeg,
            MediaType::Png => ImageFormat::Png,
        }
    }

    /// Detect the media type from content, falling back to the file name.
    pub fn sniff(bytes: &[u8], name: &str) -> Option<MediaType> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Some(MediaType::Jpeg),
            Ok(ImageFormat::Png) => Some(MediaType::Png),
            Ok(_) => None,
            Err(_) => Self::from_extension(name),
        }
    }

    fn from_extension(name: &str) -> Option<MediaType> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mime())
    }
}

/// Bytes read from a path or URL, not yet checked.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A file accepted at the ingestion boundary.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Accept in-memory bytes, e.g. from an upload form.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Img2PdfError> {
        accept(RawFile {
            name: name.into(),
            bytes,
        })
    }
}

/// Check the media type of a raw file.
pub fn accept(raw: RawFile) -> Result<SourceFile, Img2PdfError> {
    match MediaType::sniff(&raw.bytes, &raw.name) {
        Some(media_type) => Ok(SourceFile {
            name: raw.name,
            media_type,
            bytes: Arc::from(raw.bytes),
        }),
        None => {
            let detected = image::guess_format(&raw.bytes)
                .map(|f| f.to_mime_type().to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Img2PdfError::UnsupportedMediaType {
                name: raw.name,
                detected,
            })
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read one input into memory.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<RawFile, Img2PdfError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.contains("://") {
        Err(Img2PdfError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        read_local(input).await
    }
}

/// Resolve and accept every input, keeping the caller's order.
///
/// Inputs are fetched up to `config.fetch_concurrency` at a time. Inputs that
/// cannot be read or are not JPEG/PNG become [`IngestRejection`]s; any other
/// error aborts.
pub async fn resolve_all<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<(Vec<SourceFile>, Vec<IngestRejection>), Img2PdfError> {
    let timeout = config.download_timeout_secs;
    let owned: Vec<String> = inputs.iter().map(|s| s.as_ref().to_string()).collect();
    let results: Vec<(String, Result<SourceFile, Img2PdfError>)> =
        stream::iter(owned)
            .map(|input| async move {
                let accepted = resolve_input(&input, timeout).await.and_then(accept);
                (input, accepted)
            })
            .buffered(config.fetch_concurrency.max(1))
            .collect()
            .await;

    let mut accepted = Vec::with_capacity(results.len());
    let mut rejected = Vec::new();
    for (input, result) in results {
        match result {
            Ok(file) => accepted.push(file),
            Err(e) if e.is_input_error() => {
                warn!("Skipping {}: {}", input, e);
                rejected.push(IngestRejection::new(input, &e));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Resolved {} inputs: {} accepted, {} rejected",
        inputs.len(),
        accepted.len(),
        rejected.len()
    );
    Ok((accepted, rejected))
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path_str: &str) -> Result<RawFile, Img2PdfError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Img2PdfError::PermissionDenied { path });
        }
        Err(_) => return Err(Img2PdfError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(RawFile { name, bytes })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<RawFile, Img2PdfError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Img2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Img2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Img2PdfError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Img2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Img2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(RawFile {
        name: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment of a URL, or a generic name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.png"));
        assert!(is_url("http://example.com/a.jpg"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("a.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniff_prefers_content_over_extension() {
        assert_eq!(MediaType::sniff(PNG_MAGIC, "photo.jpg"), Some(MediaType::Png));
        assert_eq!(MediaType::sniff(JPEG_MAGIC, "photo.png"), Some(MediaType::Jpeg));
    }

    #[test]
    fn sniff_falls_back_to_extension() {
        assert_eq!(MediaType::sniff(b"", "IMG_0001.JPEG"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::sniff(b"", "scan.png"), Some(MediaType::Png));
        assert_eq!(MediaType::sniff(b"hello", "notes.txt"), None);
    }

    #[test]
    fn accept_rejects_other_image_formats() {
        let gif = RawFile {
            name: "anim.png".into(),
            bytes: b"GIF89a\x01\0\x01\0".to_vec(),
        };
        match accept(gif) {
            Err(Img2PdfError::UnsupportedMediaType { name, detected }) => {
                assert_eq!(name, "anim.png");
                assert_eq!(detected, "image/gif");
            }
            other => panic!("expected UnsupportedMediaType, got {other:?}"),
        }
    }

    #[test]
    fn accept_keeps_name_and_bytes() {
        let file = SourceFile::from_bytes("logo.png", PNG_MAGIC.to_vec()).unwrap();
        assert_eq!(file.name, "logo.png");
        assert_eq!(file.media_type, MediaType::Png);
        assert_eq!(&file.bytes[..], PNG_MAGIC);
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.test/img/cat.jpg?s=1"), "cat.jpg");
        assert_eq!(filename_from_url("https://x.test/"), "downloaded-image");
    }

    #[tokio::test]
    async fn missing_local_file_is_file_not_found() {
        let err = resolve_input("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, Img2PdfError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_scheme_is_invalid_input() {
        let err = resolve_input("ftp://x.test/a.png", 5).await.unwrap_err();
        assert!(matches!(err, Img2PdfError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn resolve_all_keeps_order_and_collects_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.jpg");
        std::fs::write(&a, PNG_MAGIC).unwrap();
        std::fs::write(&b, b"plain text").unwrap();
        std::fs::write(&c, JPEG_MAGIC).unwrap();

        let inputs = [
            a.to_string_lossy().into_owned(),
            b.to_string_lossy().into_owned(),
            c.to_string_lossy().into_owned(),
            "/missing/d.png".to_string(),
        ];
        let config = ConversionConfig::builder().fetch_concurrency(3).build().unwrap();
        let (accepted, rejected) = resolve_all(&inputs, &config).await.unwrap();

        let names: Vec<&str> = accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.png", "c.jpg"]);
        assert_eq!(rejected.len(), 2);
        assert!(rejected[0].input.ends_with("b.txt"));
        assert_eq!(rejected[1].input, "/missing/d.png");
    }

    #[tokio::test]
    async fn resolve_all_can_run_on_a_spawned_task() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, PNG_MAGIC).unwrap();
        let inputs = vec![a.to_string_lossy().into_owned()];
        let config = ConversionConfig::default();

        let (accepted, rejected) =
            tokio::spawn(async move { resolve_all(&inputs[..], &config).await })
                .await
                .unwrap()
                .unwrap();
        assert_eq!(accepted.len(), 1);
        assert!(rejected.is_empty());
    }
}
