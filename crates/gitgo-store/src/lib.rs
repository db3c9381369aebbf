//! Object store boundary for gitgo.
//!
//! The staging index only ever references objects by [`Oid`]; reading and
//! writing their content goes through this crate. Storage itself is pluggable:
//! every backend implements [`ObjectStoreBackend`], and the [`ObjectStore`]
//! frontend layers a per-instance cache over whichever backend it is given.
//!
//! # Backends
//!
//! - [`InMemoryObjectBackend`] -- `HashMap`-based, for tests and embedding
//! - [`NullObjectBackend`] -- stores nothing and finds nothing
//!
//! The `gitgo` binary does not link this crate. It only needs identifiers,
//! which it computes with [`ContentHasher`] exactly as [`GitObject::compute_id`]
//! does, so index entries and stored objects agree on every [`Oid`].
//!
//! [`Oid`]: gitgo_types::Oid
//! [`ContentHasher`]: gitgo_types::ContentHasher

pub mod error;
pub mod memory;
pub mod null;
pub mod object;
pub mod store;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectBackend;
pub use null::NullObjectBackend;
pub use object::GitObject;
pub use store::ObjectStore;
pub use traits::ObjectStoreBackend;
