//! The [`ObjectStore`] facade: verified reads and writes through a backend,
//! with a read cache in front.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use gitgo_types::Oid;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::GitObject;
use crate::traits::ObjectStoreBackend;

/// Caching frontend over an [`ObjectStoreBackend`].
///
/// Every `ObjectStore` owns its own cache; two stores over the same backend
/// never share cached state. Cached objects are immutable, so a cache hit is
/// always as good as a backend read.
pub struct ObjectStore {
    backend: Arc<dyn ObjectStoreBackend>,
    cache: RwLock<HashMap<Oid, GitObject>>,
}

impl ObjectStore {
    /// Create a store with an empty cache over the given backend.
    pub fn new(backend: Arc<dyn ObjectStoreBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Look up an object, consulting the cache before the backend.
    ///
    /// Objects fetched from the backend are cached.
    pub fn get(&self, oid: &Oid) -> StoreResult<Option<GitObject>> {
        if let Some(hit) = self.read_cache()?.get(oid) {
            return Ok(Some(hit.clone()));
        }
        let fetched = self.backend.fetch(oid)?;
        if let Some(obj) = &fetched {
            debug!(%oid, kind = %obj.kind, "cached object from backend");
            self.write_cache()?.insert(*oid, obj.clone());
        }
        Ok(fetched)
    }

    /// Store an object and return its identifier.
    ///
    /// Objects already present in the cache are not written to the backend
    /// again.
    pub fn put(&self, object: GitObject) -> StoreResult<Oid> {
        let oid = object.compute_id();
        self.insert(oid, object)?;
        Ok(oid)
    }

    /// Store an object under a caller-supplied identifier.
    ///
    /// Fails with [`StoreError::HashMismatch`] if the identifier does not
    /// match the object's content.
    pub fn put_as(&self, oid: Oid, object: GitObject) -> StoreResult<()> {
        let computed = object.compute_id();
        if computed != oid {
            return Err(StoreError::HashMismatch {
                expected: oid,
                computed,
            });
        }
        self.insert(oid, object)
    }

    /// Returns `true` if the object is cached or known to the backend.
    pub fn contains(&self, oid: &Oid) -> StoreResult<bool> {
        if self.read_cache()?.contains_key(oid) {
            return Ok(true);
        }
        self.backend.exists(oid)
    }

    /// Number of objects held in this store's cache.
    pub fn cached_len(&self) -> StoreResult<usize> {
        Ok(self.read_cache()?.len())
    }

    fn insert(&self, oid: Oid, object: GitObject) -> StoreResult<()> {
        let mut cache = self.write_cache()?;
        if cache.contains_key(&oid) {
            return Ok(());
        }
        self.backend.store(&oid, &object)?;
        debug!(%oid, kind = %object.kind, size = object.size(), "stored object");
        cache.insert(oid, object);
        Ok(())
    }

    fn read_cache(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<Oid, GitObject>>> {
        self.cache
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_cache(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<Oid, GitObject>>> {
        self.cache
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.cached_len().unwrap_or_default();
        f.debug_struct("ObjectStore")
            .field("cached", &cached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryObjectBackend, NullObjectBackend};

    #[test]
    fn put_then_get_hits_cache() {
        let store = ObjectStore::new(Arc::new(NullObjectBackend));
        let oid = store.put(GitObject::blob(b"cached".to_vec())).unwrap();
        // The null backend forgets everything; only the cache can answer.
        let obj = store.get(&oid).unwrap().expect("cached");
        assert_eq!(obj.data, b"cached");
        assert!(store.contains(&oid).unwrap());
    }

    #[test]
    fn get_falls_back_to_backend_and_caches() {
        let backend = Arc::new(InMemoryObjectBackend::new());
        let obj = GitObject::blob(b"on disk".to_vec());
        let oid = obj.compute_id();
        backend.store(&oid, &obj).unwrap();

        let store = ObjectStore::new(backend);
        assert_eq!(store.cached_len().unwrap(), 0);
        assert_eq!(store.get(&oid).unwrap(), Some(obj));
        assert_eq!(store.cached_len().unwrap(), 1);
    }

    #[test]
    fn missing_object_is_none() {
        let store = ObjectStore::new(Arc::new(InMemoryObjectBackend::new()));
        let oid = GitObject::blob(b"absent".to_vec()).compute_id();
        assert!(store.get(&oid).unwrap().is_none());
        assert!(!store.contains(&oid).unwrap());
    }

    #[test]
    fn put_writes_through_once() {
        let backend = Arc::new(InMemoryObjectBackend::new());
        let store = ObjectStore::new(backend.clone());
        let a = store.put(GitObject::blob(b"a".to_vec())).unwrap();
        let again = store.put(GitObject::blob(b"a".to_vec())).unwrap();
        assert_eq!(a, again);
        assert_eq!(backend.len().unwrap(), 1);
        assert!(backend.exists(&a).unwrap());
    }

    #[test]
    fn put_as_rejects_wrong_id() {
        let store = ObjectStore::new(Arc::new(InMemoryObjectBackend::new()));
        let wrong = GitObject::blob(b"other".to_vec()).compute_id();
        let result = store.put_as(wrong, GitObject::blob(b"mine".to_vec()));
        assert!(matches!(result, Err(StoreError::HashMismatch { .. })));
    }

    #[test]
    fn stores_do_not_share_caches() {
        let backend: Arc<dyn ObjectStoreBackend> = Arc::new(NullObjectBackend);
        let first = ObjectStore::new(Arc::clone(&backend));
        let second = ObjectStore::new(backend);
        let oid = first.put(GitObject::blob(b"private".to_vec())).unwrap();
        assert!(second.get(&oid).unwrap().is_none());
    }
}
