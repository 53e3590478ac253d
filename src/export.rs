//! Export: wrap serialised PDF bytes into a named [`ConversionResult`].
//!
//! The suggested file name is `<prefix>-<timestamp>.pdf`, where the timestamp
//! is the ISO-8601 UTC time cut to whole seconds with `:` and `.` turned
//! into `-`, e.g. `imagens-convertidas-2024-03-05T14-07-09.pdf`. Names sort
//! chronologically and are valid on every common file system.

use crate::output::{ConversionResult, PagePlacement};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static UNSAFE_TIMESTAMP_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:.]").unwrap());

/// Suggested download name for a document created at `now`.
pub fn suggested_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    let iso = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stamp: String = iso.chars().take(19).collect();
    format!(
        "{}-{}.pdf",
        prefix,
        UNSAFE_TIMESTAMP_CHARS.replace_all(&stamp, "-")
    )
}

/// Package the bytes of a finished document.
pub fn materialize(
    bytes: Vec<u8>,
    pages: Vec<PagePlacement>,
    prefix: &str,
    now: DateTime<Utc>,
) -> ConversionResult {
    let file_name = suggested_file_name(prefix, now);
    debug!("Materialised {} ({} bytes)", file_name, bytes.len());
    ConversionResult::new(bytes, file_name, pages, now)
}
