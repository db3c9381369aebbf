//! An index bound to a path and a storage backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::IndexBackend;
use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::file::SnapshotFileBackend;
use crate::index::{Index, IndexVersion};

/// An [`Index`] bound to a storage path.
///
/// All I/O goes through the [`IndexBackend`] and happens only in
/// [`open`](Self::open), [`reload`](Self::reload) and [`save`](Self::save).
/// Edits made through [`index_mut`](Self::index_mut) stay in memory until
/// the next save.
pub struct PersistedIndex {
    path: PathBuf,
    backend: Arc<dyn IndexBackend>,
    index: Index,
}

impl PersistedIndex {
    /// Start an empty index at `path` without consulting the backend.
    pub fn create(
        path: impl Into<PathBuf>,
        backend: Arc<dyn IndexBackend>,
        version: IndexVersion,
    ) -> Self {
        Self {
            path: path.into(),
            backend,
            index: Index::from_version(version),
        }
    }

    /// Load the index stored at `path`.
    ///
    /// If the backend has nothing stored there, the index starts empty at
    /// `default_version`. A stored index keeps its own version.
    pub fn open(
        path: impl Into<PathBuf>,
        backend: Arc<dyn IndexBackend>,
        default_version: IndexVersion,
    ) -> IndexResult<Self> {
        let path = path.into();
        let index = match backend.load(&path)? {
            Some(snapshot) => Index::from_snapshot(snapshot)?,
            None => {
                debug!(path = %path.display(), version = %default_version, "starting empty index");
                Index::from_version(default_version)
            }
        };
        info!(
            path = %path.display(),
            version = %index.version(),
            entries = index.size(),
            "opened index"
        );
        Ok(Self {
            path,
            backend,
            index,
        })
    }

    /// Open the snapshot file described by `config`.
    pub fn from_config(config: &IndexConfig) -> IndexResult<Self> {
        let version = config.validate()?;
        let backend = SnapshotFileBackend::new().with_fsync(config.fsync);
        Self::open(config.path.clone(), Arc::new(backend), version)
    }

    /// Hand the current contents to the backend.
    pub fn save(&self) -> IndexResult<()> {
        self.backend.save(&self.path, &self.index.snapshot())
    }

    /// Discard in-memory edits and load the stored index again.
    ///
    /// On error the in-memory index is left as it was.
    pub fn reload(&mut self) -> IndexResult<()> {
        let version = self.index.version();
        self.index = match self.backend.load(&self.path)? {
            Some(snapshot) => Index::from_snapshot(snapshot)?,
            None => Index::from_version(version),
        };
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    /// Unbind from storage, keeping the in-memory index.
    pub fn into_index(self) -> Index {
        self.index
    }
}

impl fmt::Debug for PersistedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedIndex")
            .field("path", &self.path)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
