//! Staging index for gitgo.
//!
//! Records, per content identifier, which entry is staged for the next
//! commit and, during a merge, which of the base, ours and theirs versions
//! are in conflict. An identifier lives either in stage 0 or in any of
//! stages 1-3, never both.
//!
//! # Key Types
//!
//! - [`Index`] -- The four-stage table and its read/write/delete operations
//! - [`Address`] -- Stage-0, single-stage or all-stages addressing
//! - [`Staged`] / [`Lookup`] -- Values written to and read from an address
//! - [`IndexEntry`] -- One staged path's metadata and content reference
//! - [`PersistedIndex`] -- An index bound to a path and an [`IndexBackend`]
//! - [`SnapshotFileBackend`] -- CRC-checked snapshot files on disk

pub mod address;
pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod file;
pub mod index;
pub mod persisted;
pub mod snapshot;
pub mod stage;

pub use address::{Address, Lookup, StageSlots, Staged};
pub use backend::{InMemoryIndexBackend, IndexBackend, NullIndexBackend};
pub use config::{IndexConfig, DEFAULT_INDEX_PATH};
pub use entry::{EntryType, FileMode, IndexEntry, IndexFlag, Timestamp};
pub use error::{IndexError, IndexResult};
pub use file::SnapshotFileBackend;
pub use index::{Index, IndexVersion};
pub use persisted::PersistedIndex;
pub use snapshot::IndexSnapshot;
pub use stage::Stage;
