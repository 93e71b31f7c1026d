//! The shared store handle.

use std::sync::Arc;

use crate::backend::DocumentBackend;
use crate::memory::MemoryStore;

/// Typed access to the chat collections, backed by any [`DocumentBackend`].
///
/// The handle is cheap to clone; clones share the backend. The typed CRUD
/// and watch helpers live in the `profiles` and `messages` modules.
#[derive(Clone)]
pub struct ChatStore {
    backend: Arc<dyn DocumentBackend>,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        tracing::debug!("store handle created");
        Self { backend }
    }

    /// Store backed by [`MemoryStore`], for tests and local development.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Raw backend access. Callers should prefer the typed helpers.
    pub fn backend(&self) -> &dyn DocumentBackend {
        self.backend.as_ref()
    }
}
