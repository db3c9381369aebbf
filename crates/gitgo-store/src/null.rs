//! A backend that stores nothing.

use gitgo_types::Oid;
use tracing::trace;

use crate::error::StoreResult;
use crate::object::GitObject;
use crate::traits::ObjectStoreBackend;

/// A backend that discards every write and finds nothing.
///
/// Useful when a repository-level component needs an object store but the
/// caller has no storage to offer, e.g. dry runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObjectBackend;

impl ObjectStoreBackend for NullObjectBackend {
    fn fetch(&self, oid: &Oid) -> StoreResult<Option<GitObject>> {
        trace!(%oid, "null backend fetch");
        Ok(None)
    }

    fn store(&self, oid: &Oid, _object: &GitObject) -> StoreResult<()> {
        trace!(%oid, "null backend store discarded");
        Ok(())
    }
}
