//! Foundation types for gitgo.
//!
//! Every other gitgo crate depends on `gitgo-types` for the identifiers that
//! address stored content.
//!
//! # Key Types
//!
//! - [`Oid`] -- Content-addressed identifier in a fixed 40- or 64-hex format
//! - [`ObjectKind`] -- The kind of a stored object (blob, tree, commit, tag)
//! - [`ContentHasher`] -- Kind-tagged BLAKE3 hashing that produces [`Oid`]s

pub mod error;
pub mod hasher;
pub mod kind;
pub mod oid;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use kind::ObjectKind;
pub use oid::{Oid, OidFormat};
