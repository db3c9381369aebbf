use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid object id length {0}: expected 40 or 64 hex characters")]
    InvalidOidLength(usize),

    #[error("unknown object kind: {0}")]
    UnknownKind(String),
}
