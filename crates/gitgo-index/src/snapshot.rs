//! Portable copy of an index's contents, exchanged with storage backends.

use gitgo_types::Oid;
use serde::{Deserialize, Serialize};

use crate::entry::IndexEntry;
use crate::index::IndexVersion;
use crate::stage::Stage;

/// Every entry of an index with the stage and identifier it is filed under,
/// in iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: IndexVersion,
    pub entries: Vec<(Stage, Oid, IndexEntry)>,
}

impl IndexSnapshot {
    /// An empty snapshot at the given version.
    pub fn empty(version: IndexVersion) -> Self {
        Self {
            version,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
