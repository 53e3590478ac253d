//! Pipeline stages for image-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ (batch) ──▶ decode ──▶ (layout) ──▶ canvas
//! (path/URL)            (pixels)                (printpdf)
//!                  └──▶ encode (thumbnails)
//! ```
//!
//! 1. [`input`]  — read paths and URLs, accept only JPEG and PNG
//! 2. [`decode`] — intrinsic size and drawable pixels per image; runs in
//!    `spawn_blocking` because the codecs are synchronous
//! 3. [`encode`] — small PNG data URIs for list views
//! 4. [`canvas`] — record pages and draws, serialise the PDF at the end

pub mod canvas;
pub mod decode;
pub mod encode;
pub mod input;
