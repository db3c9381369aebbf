//! The pluggable backend seam for object storage.

use gitgo_types::Oid;

use crate::error::StoreResult;
use crate::object::GitObject;

/// Storage behind an [`ObjectStore`](crate::ObjectStore).
///
/// Implementations must satisfy these invariants:
/// - Objects are immutable once stored; storing the same identifier twice
///   is a no-op.
/// - A backend never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStoreBackend: Send + Sync {
    /// Resolve an identifier to its object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn fetch(&self, oid: &Oid) -> StoreResult<Option<GitObject>>;

    /// Persist an object under the given identifier.
    fn store(&self, oid: &Oid, object: &GitObject) -> StoreResult<()>;

    /// Check whether an object exists.
    ///
    /// Default implementation fetches the object. Backends may override
    /// with a cheaper lookup.
    fn exists(&self, oid: &Oid) -> StoreResult<bool> {
        Ok(self.fetch(oid)?.is_some())
    }
}
