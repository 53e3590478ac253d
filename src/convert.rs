//! One-shot conversion entry points.
//!
//! These wrap the whole pipeline for callers that just have a list of paths
//! or URLs: resolve inputs, build a batch, assemble it, return the result.
//! Use [`crate::session::ConverterSession`] instead when the batch is edited
//! between conversions.

use crate::assemble::Assembler;
use crate::batch::{format_file_size, ImageBatch, ImageId};
use crate::config::ConversionConfig;
use crate::error::{Img2PdfError, IngestRejection};
use crate::output::{ConversionOutput, ConversionStats, ImageInfo};
use crate::pipeline::encode;
use crate::pipeline::input::{self, SourceFile};
use crate::preview::PreviewRegistry;
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Convert images (paths or HTTP/HTTPS URLs) into one PDF, one page each.
///
/// Pages follow the order of `inputs`. Inputs that are unreadable or not
/// JPEG/PNG are skipped and listed in [`ConversionOutput::rejected`].
///
/// # Errors
/// - [`Img2PdfError::EmptyBatch`] when `inputs` is empty
/// - [`Img2PdfError::NothingAccepted`] when every input was rejected; the
///   rejections travel with the error
/// - [`Img2PdfError::Decode`] when an accepted image cannot be decoded
pub async fn convert<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let total_start = Instant::now();
    info!("Starting conversion of {} inputs", inputs.len());

    // ── Step 1: Resolve and accept inputs ────────────────────────────────
    let (files, rejected) = input::resolve_all(inputs, config).await?;
    let fetch_duration_ms = total_start.elapsed().as_millis() as u64;
    if files.is_empty() && !rejected.is_empty() {
        return Err(Img2PdfError::NothingAccepted { rejected });
    }

    // ── Step 2: Build the batch ──────────────────────────────────────────
    let mut batch = ImageBatch::with_registry(PreviewRegistry::global());
    batch.ingest(files);

    // ── Step 3: Assemble ─────────────────────────────────────────────────
    let assembly_start = Instant::now();
    let result = Assembler::new(config.clone()).assemble(&batch).await?;
    let assembly_duration_ms = assembly_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        total_inputs: inputs.len(),
        accepted_images: batch.len(),
        rejected_inputs: rejected.len(),
        pages: result.page_count(),
        output_bytes: result.len(),
        fetch_duration_ms,
        assembly_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} rejected, {}ms total",
        stats.pages, stats.rejected_inputs, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        result,
        rejected,
        stats,
    })
}

/// Convert already-loaded files, e.g. from an upload form.
///
/// No input is rejected here: [`SourceFile`]s have passed the media type
/// check on construction.
pub async fn convert_files(
    files: Vec<SourceFile>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    let start = Instant::now();
    let total_inputs = files.len();
    let mut batch = ImageBatch::with_registry(PreviewRegistry::global());
    batch.ingest(files);

    let result = Assembler::new(config.clone()).assemble(&batch).await?;
    let elapsed = start.elapsed().as_millis() as u64;
    let stats = ConversionStats {
        total_inputs,
        accepted_images: batch.len(),
        rejected_inputs: 0,
        pages: result.page_count(),
        output_bytes: result.len(),
        fetch_duration_ms: 0,
        assembly_duration_ms: elapsed,
        total_duration_ms: elapsed,
    };
    Ok(ConversionOutput {
        result,
        rejected: Vec::new(),
        stats,
    })
}

/// Convert and write the PDF to `output_path` atomically.
pub async fn convert_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Img2PdfError> {
    let output = convert(inputs, config).await?;
    output.result.save_to(output_path).await?;
    for r in &output.rejected {
        warn!("Skipped {}", r);
    }
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, config))
}

/// Describe the accepted inputs without producing a PDF.
///
/// Reads only what is needed for the size and orientation, plus a thumbnail
/// per image. Returns the rejections alongside, in input order.
pub async fn inspect<S: AsRef<str>>(
    inputs: &[S],
    config: &ConversionConfig,
) -> Result<(Vec<ImageInfo>, Vec<IngestRejection>), Img2PdfError> {
    let (files, rejected) = input::resolve_all(inputs, config).await?;
    let max_edge = config.thumbnail_max_edge;

    let mut infos = Vec::with_capacity(files.len());
    for file in files {
        let info = tokio::task::spawn_blocking(move || describe(file, max_edge))
            .await
            .map_err(|e| Img2PdfError::Internal(format!("inspect task panicked: {e}")))??;
        infos.push(info);
    }
    Ok((infos, rejected))
}

fn describe(file: SourceFile, max_edge: u32) -> Result<ImageInfo, Img2PdfError> {
    let decode_err = |detail: String| Img2PdfError::Decode {
        identity: ImageId::new(),
        name: file.name.clone(),
        detail,
    };

    let mut reader = ImageReader::new(Cursor::new(&file.bytes[..]));
    reader.set_format(file.media_type.image_format());
    let mut decoder = reader.into_decoder().map_err(|e| decode_err(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let (w, h) = decoder.dimensions();
    let (width, height) = match orientation {
        Orientation::Rotate90
        | Orientation::Rotate270
        | Orientation::Rotate90FlipH
        | Orientation::Rotate270FlipH => (h, w),
        _ => (w, h),
    };

    let png = encode::thumbnail_png(&file.bytes, max_edge).map_err(|e| decode_err(e.to_string()))?;
    let thumbnail = encode::png_data_uri(&png);

    Ok(ImageInfo {
        name: file.name.clone(),
        media_type: file.media_type,
        size_bytes: file.bytes.len(),
        formatted_size: format_file_size(file.bytes.len() as u64),
        width,
        height,
        thumbnail,
    })
}
