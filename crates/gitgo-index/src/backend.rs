//! The storage boundary behind a [`PersistedIndex`](crate::PersistedIndex).
//!
//! Backends move whole [`IndexSnapshot`]s in and out of storage; they are
//! consulted only when an index is opened or saved, never on the read path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, trace};

use crate::error::{IndexError, IndexResult};
use crate::snapshot::IndexSnapshot;

/// Storage backend for persisted indexes.
///
/// Implementations must be thread-safe (`Send + Sync`). A `save` replaces
/// whatever was stored at the path; a later `load` of the same path returns
/// the saved snapshot.
pub trait IndexBackend: Send + Sync {
    /// Load the snapshot stored at `path`.
    ///
    /// Returns `Ok(None)` if nothing has been stored there.
    fn load(&self, path: &Path) -> IndexResult<Option<IndexSnapshot>>;

    /// Store a snapshot at `path`, replacing any previous one.
    fn save(&self, path: &Path, snapshot: &IndexSnapshot) -> IndexResult<()>;
}

/// A backend that never finds a stored index and discards saves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIndexBackend;

impl IndexBackend for NullIndexBackend {
    fn load(&self, path: &Path) -> IndexResult<Option<IndexSnapshot>> {
        trace!(path = %path.display(), "null index backend load");
        Ok(None)
    }

    fn save(&self, path: &Path, snapshot: &IndexSnapshot) -> IndexResult<()> {
        trace!(
            path = %path.display(),
            entries = snapshot.len(),
            "null index backend save discarded"
        );
        Ok(())
    }
}

/// An in-memory backend keyed by path, for tests and embedding.
///
/// Data is lost when the backend is dropped.
#[derive(Debug, Default)]
pub struct InMemoryIndexBackend {
    snapshots: RwLock<HashMap<PathBuf, IndexSnapshot>>,
}

impl InMemoryIndexBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a snapshot has been saved at `path`.
    pub fn contains(&self, path: &Path) -> IndexResult<bool> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(snapshots.contains_key(path))
    }
}

impl IndexBackend for InMemoryIndexBackend {
    fn load(&self, path: &Path) -> IndexResult<Option<IndexSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(snapshots.get(path).cloned())
    }

    fn save(&self, path: &Path, snapshot: &IndexSnapshot) -> IndexResult<()> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?;
        snapshots.insert(path.to_path_buf(), snapshot.clone());
        debug!(path = %path.display(), entries = snapshot.len(), "saved index in memory");
        Ok(())
    }
}
