//! Error types for the index crate.

use std::path::PathBuf;

use gitgo_types::Oid;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index was constructed with a format version other than 2, 3 or 4.
    #[error("invalid index version {0}: expected 2, 3 or 4")]
    InvalidVersion(u32),

    /// An address could not be built or parsed.
    #[error("invalid index address: {0}")]
    InvalidAddress(String),

    /// A write supplied a value whose shape does not fit the address.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A write would place the identifier in stage 0 and in a conflict stage.
    #[error("cannot set index entry for {0} in stage 0 and stages 1-3")]
    ConflictingStageAssignment(Oid),

    /// An entry field (mode, type, flag) could not be parsed.
    #[error("invalid entry field: {0}")]
    InvalidField(String),

    /// A stored snapshot failed framing or integrity checks.
    #[error("corrupt index snapshot {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A lock guarding backend state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error from a storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
