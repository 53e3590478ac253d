//! # img2pdf
//!
//! Combine JPEG and PNG images into a single PDF, one image per page.
//!
//! Each image is scaled down (never up) to fit inside the page margins,
//! keeps its aspect ratio and is centred on its page. Pages follow the order
//! in which images were added.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images (paths / URLs)
//!  │
//!  ├─ 1. Input     read or download, accept only image/jpeg and image/png
//!  ├─ 2. Ingest    ImageBatch: id + preview handle per image, in order
//!  ├─ 3. Decode    intrinsic size + pixels (spawn_blocking), one at a time
//!  ├─ 4. Layout    fit_to_page: shrink to the margin box, centre
//!  ├─ 5. Draw      one page per image (printpdf)
//!  └─ 6. Export    PDF bytes + `<prefix>-<timestamp>.pdf`, atomic save
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2pdf::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert(&["cover.jpg", "page-2.png"], &config).await?;
//!     let path = output.result.save_in_dir(".").await?;
//!     eprintln!("{} pages → {}", output.stats.pages, path.display());
//!     for skipped in &output.rejected {
//!         eprintln!("skipped {skipped}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Interactive use
//!
//! Front-ends that let the user add and remove images before converting
//! keep a [`ConverterSession`]: it owns the [`ImageBatch`] and the latest
//! [`ConversionResult`], and clearing the batch discards the result too.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! img2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble, Assembler};
pub use batch::{format_file_size, ImageBatch, ImageId, ImageItem};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSize};
pub use convert::{convert, convert_files, convert_sync, convert_to_file, inspect};
pub use error::{Img2PdfError, IngestRejection};
pub use export::suggested_file_name;
pub use layout::{fit_to_page, ImageSize, PageLayout};
pub use output::{ConversionOutput, ConversionResult, ConversionStats, ImageInfo, PagePlacement};
pub use pipeline::canvas::{DocumentCanvas, PdfCanvas};
pub use pipeline::decode::{ImageCrateDecoder, PreviewDecoder};
pub use pipeline::input::{MediaType, SourceFile};
pub use preview::{PreviewHandle, PreviewRegistry, RegistryStats};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ConverterSession;
pub use stream::{convert_stream, ChannelProgress, ProgressEvent, ProgressStream};
