//! Error types for the object store crate.

use gitgo_types::Oid;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier a caller supplied does not match the object's content.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: Oid, computed: Oid },

    /// Attempted to store an object under the null identifier.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
