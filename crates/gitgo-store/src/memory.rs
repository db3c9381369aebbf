//! In-memory object backend.

use std::collections::HashMap;
use std::sync::RwLock;

use gitgo_types::Oid;

use crate::error::{StoreError, StoreResult};
use crate::object::GitObject;
use crate::traits::ObjectStoreBackend;

/// In-memory, HashMap-based object backend.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are cloned on fetch/store.
pub struct InMemoryObjectBackend {
    objects: RwLock<HashMap<Oid, GitObject>>,
}

impl InMemoryObjectBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_map()?.len())
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Return a sorted list of all stored identifiers.
    pub fn all_ids(&self) -> StoreResult<Vec<Oid>> {
        let mut ids: Vec<Oid> = self.read_map()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn read_map(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<Oid, GitObject>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for InMemoryObjectBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStoreBackend for InMemoryObjectBackend {
    fn fetch(&self, oid: &Oid) -> StoreResult<Option<GitObject>> {
        Ok(self.read_map()?.get(oid).cloned())
    }

    fn store(&self, oid: &Oid, object: &GitObject) -> StoreResult<()> {
        if oid.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self
            .objects
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        // Same identifier always maps to the same content.
        map.entry(*oid).or_insert_with(|| object.clone());
        Ok(())
    }

    fn exists(&self, oid: &Oid) -> StoreResult<bool> {
        Ok(self.read_map()?.contains_key(oid))
    }
}

impl std::fmt::Debug for InMemoryObjectBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read_map().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("InMemoryObjectBackend")
            .field("object_count", &count)
            .finish()
    }
}
