//! Typed object payloads and their content identifiers.

use gitgo_types::{ContentHasher, ObjectKind, Oid};
use serde::{Deserialize, Serialize};

/// A stored object: kind tag plus raw content.
///
/// The store never interprets `data`; it is keyed purely by the identifier
/// computed from kind and content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The raw bytes of the object.
    pub data: Vec<u8>,
}

impl GitObject {
    /// Create a new object from kind and content.
    pub fn new(kind: ObjectKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Shorthand for a blob object.
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ObjectKind::Blob, data)
    }

    /// Compute the content-addressed identifier for this object.
    pub fn compute_id(&self) -> Oid {
        ContentHasher::new(self.kind).hash(&self.data)
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
