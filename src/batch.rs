//! The image batch: the ordered set of images staged for one document.
//!
//! Insertion order is page order. The batch changes only through
//! [`ImageBatch::ingest`], [`ImageBatch::remove`] and [`ImageBatch::clear`];
//! each effective change bumps [`ImageBatch::version`] so a view can poll
//! for updates instead of diffing the list.
//!
//! Every item owns a [`PreviewHandle`]. Removing the item, clearing the
//! batch or dropping the batch releases the handle, once.

use crate::pipeline::input::{MediaType, SourceFile};
use crate::preview::{PreviewHandle, PreviewRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Opaque identity of a batch item, generated at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form, as shown next to thumbnails.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..9])
    }
}

/// One staged image.
#[derive(Debug)]
pub struct ImageItem {
    id: ImageId,
    name: String,
    media_type: MediaType,
    source: Arc<[u8]>,
    preview: PreviewHandle,
}

impl ImageItem {
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// File name shown to the user (last path or URL segment).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// The original file content, unchanged.
    pub fn source_bytes(&self) -> &Arc<[u8]> {
        &self.source
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn size_bytes(&self) -> usize {
        self.source.len()
    }

    /// Size for display, e.g. `"1.5 MB"`.
    pub fn formatted_size(&self) -> String {
        format_file_size(self.source.len() as u64)
    }
}

/// Ordered, identity-unique collection of [`ImageItem`]s.
#[derive(Debug)]
pub struct ImageBatch {
    items: Vec<ImageItem>,
    registry: PreviewRegistry,
    version: u64,
}

impl Default for ImageBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBatch {
    /// An empty batch whose handles live in the process-wide registry.
    pub fn new() -> Self {
        Self::with_registry(PreviewRegistry::global())
    }

    /// An empty batch whose handles live in `registry`.
    pub fn with_registry(registry: PreviewRegistry) -> Self {
        Self {
            items: Vec::new(),
            registry,
            version: 0,
        }
    }

    /// Append files in the order given; returns the ids created.
    ///
    /// Files reach this point already accepted by
    /// [`crate::pipeline::input::accept`], so every file becomes an item.
    pub fn ingest<I>(&mut self, files: I) -> Vec<ImageId>
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let mut added = Vec::new();
        for file in files {
            let source: Arc<[u8]> = file.bytes;
            let preview = self.registry.acquire(Arc::clone(&source));
            let id = ImageId::new();
            debug!("Ingested '{}' as {} ({})", file.name, id, preview.uri());
            self.items.push(ImageItem {
                id,
                name: file.name,
                media_type: file.media_type,
                source,
                preview,
            });
            added.push(id);
        }
        if !added.is_empty() {
            self.version += 1;
        }
        added
    }

    /// Remove the item with `id`, releasing its preview handle.
    ///
    /// Returns `false` (and changes nothing) when no such item exists.
    pub fn remove(&mut self, id: ImageId) -> bool {
        match self.position(id) {
            Some(index) => {
                let item = self.items.remove(index);
                debug!("Removed '{}' ({})", item.name, item.id);
                item.preview.release();
                self.version += 1;
                true
            }
            None => false,
        }
    }

    /// Release every preview handle and empty the batch.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        debug!("Clearing {} images", self.items.len());
        self.items.clear();
        self.version += 1;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ImageItem> {
        self.items.iter()
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Sum of the original file sizes.
    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(ImageItem::size_bytes).sum()
    }

    /// Incremented on every mutation that changed the batch.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }
}

/// Human-readable file size with up to two decimals: `0 Bytes`, `512 Bytes`,
/// `1.5 KB`, `2.25 MB`. Anything larger is still expressed in MB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
