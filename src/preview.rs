//! Preview handles: scarce, process-wide references to image bytes.
//!
//! A [`PreviewHandle`] lets the pipeline read an image's pixels (for
//! decoding and thumbnails) without going back to the original file. Handles
//! live in a [`PreviewRegistry`], a table of slots shared by the whole
//! process, and each slot stays occupied until its handle is released.
//!
//! Release is tied to ownership: a handle frees its slot exactly once, when
//! it is dropped or passed to [`PreviewHandle::release`]. The batch owns
//! every handle it creates, so removing an item, clearing the batch, or
//! dropping the batch returns the slots without any extra bookkeeping.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

static GLOBAL: Lazy<PreviewRegistry> = Lazy::new(PreviewRegistry::default);

/// Slot counters of a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Handles ever acquired.
    pub issued: u64,
    /// Handles released.
    pub released: u64,
    /// Slots currently occupied (`issued - released`).
    pub live: usize,
}

#[derive(Default)]
struct RegistryState {
    next_key: u64,
    slots: HashMap<u64, Arc<[u8]>>,
    issued: u64,
    released: u64,
}

/// The table of live preview handles.
///
/// Cloning is cheap and yields another reference to the same table.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl PreviewRegistry {
    /// A fresh registry, independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Whether both values refer to the same table.
    pub fn same_as(&self, other: &PreviewRegistry) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Occupy a slot for `bytes` and return the owning handle.
    pub fn acquire(&self, bytes: Arc<[u8]>) -> PreviewHandle {
        let mut state = self.lock();
        let key = state.next_key;
        state.next_key += 1;
        state.issued += 1;
        state.slots.insert(key, bytes);
        debug!("Acquired preview://{key} ({} live)", state.slots.len());
        PreviewHandle {
            key,
            registry: self.clone(),
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        RegistryStats {
            issued: state.issued,
            released: state.released,
            live: state.slots.len(),
        }
    }

    fn get(&self, key: u64) -> Option<Arc<[u8]>> {
        self.lock().slots.get(&key).cloned()
    }

    fn release(&self, key: u64) {
        let mut state = self.lock();
        if state.slots.remove(&key).is_some() {
            state.released += 1;
        } else {
            warn!("preview://{key} released twice");
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Counters stay consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owning reference to one registry slot.
///
/// Not `Clone`: exactly one owner releases the slot.
pub struct PreviewHandle {
    key: u64,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    /// Opaque, process-local URI naming this handle.
    pub fn uri(&self) -> String {
        format!("preview://{}", self.key)
    }

    /// The bytes this handle refers to.
    ///
    /// Returns `None` only if the registry lost the slot, which ownership
    /// rules out for a live handle.
    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.registry.get(self.key)
    }

    /// Release the slot now instead of at drop.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.key);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.uri()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn acquire_and_drop_balance() {
        let registry = PreviewRegistry::new();
        let a = registry.acquire(bytes("a"));
        let b = registry.acquire(bytes("b"));
        assert_ne!(a.uri(), b.uri());
        assert_eq!(registry.stats().live, 2);

        drop(a);
        b.release();

        assert_eq!(
            registry.stats(),
            RegistryStats {
                issued: 2,
                released: 2,
                live: 0
            }
        );
    }

    #[test]
    fn handle_reads_shared_bytes_without_copying() {
        let registry = PreviewRegistry::new();
        let source = bytes("pixels");
        let handle = registry.acquire(Arc::clone(&source));
        let read = handle.bytes().unwrap();
        assert!(Arc::ptr_eq(&read, &source));
    }

    #[test]
    fn global_registry_is_shared() {
        let a = PreviewRegistry::global();
        let b = PreviewRegistry::global();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&PreviewRegistry::new()));
    }
}
