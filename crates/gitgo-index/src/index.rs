//! The core Index structure managing staged entries in memory.
//!
//! The [`Index`] owns four stage maps keyed by content identifier. Every
//! mutation preserves one invariant: an identifier lives either in stage 0
//! or in some of stages 1-3, never both. All operations are in-memory; the
//! [`PersistedIndex`](crate::PersistedIndex) handles loading and saving.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use gitgo_types::Oid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::{Address, Lookup, StageSlots, Staged};
use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};
use crate::snapshot::IndexSnapshot;
use crate::stage::{Stage, StageTable};

/// Index format version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexVersion {
    V2,
    #[default]
    V3,
    V4,
}

impl IndexVersion {
    pub const fn number(self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }
}

impl TryFrom<u32> for IndexVersion {
    type Error = IndexError;

    fn try_from(n: u32) -> IndexResult<Self> {
        match n {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(IndexError::InvalidVersion(other)),
        }
    }
}

impl fmt::Display for IndexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for IndexVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.number())
    }
}

impl<'de> Deserialize<'de> for IndexVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u32::deserialize(deserializer)?;
        IndexVersion::try_from(n).map_err(serde::de::Error::custom)
    }
}

/// The staging index: a four-stage table of entries keyed by identifier.
///
/// - Stage 0: the working tree that was checked out
/// - Stage 1: on a merge, the common ancestor
/// - Stage 2: on a merge, our side (typically this branch)
/// - Stage 3: on a merge, their side (typically the other branch)
///
/// Stage 0 and stages 1-3 are mutually exclusive for an identifier.
///
/// The index is single-owner: mutation takes `&mut self`, so a `set` or
/// `remove` is never observed half-applied. Share it across threads behind
/// a lock.
#[derive(Clone, Debug, Default)]
pub struct Index {
    version: IndexVersion,
    table: StageTable,
}

impl Index {
    /// Create an empty version-3 index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given raw format version.
    ///
    /// Fails with [`IndexError::InvalidVersion`] unless `version` is 2, 3 or 4.
    pub fn with_version(version: u32) -> IndexResult<Self> {
        Ok(Self::from_version(IndexVersion::try_from(version)?))
    }

    /// Create an empty index with an already-validated version.
    pub fn from_version(version: IndexVersion) -> Self {
        Self {
            version,
            table: StageTable::default(),
        }
    }

    pub fn version(&self) -> IndexVersion {
        self.version
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Read the entry or entries at an address.
    pub fn get(&self, address: Address) -> Lookup<'_> {
        match address {
            Address::Default(oid) => Lookup::Entry(self.entry(&oid)),
            Address::Stage(stage, oid) => Lookup::Entry(self.stage_entry(stage, &oid)),
            Address::AllStages(oid) => Lookup::Stages(self.stages(&oid)),
        }
    }

    /// The stage-0 entry for an identifier.
    pub fn entry(&self, oid: &Oid) -> Option<&IndexEntry> {
        self.stage_entry(Stage::Clean, oid)
    }

    /// The entry for an identifier at one stage.
    pub fn stage_entry(&self, stage: Stage, oid: &Oid) -> Option<&IndexEntry> {
        self.table.stage(stage).get(oid)
    }

    /// All four stage slots for an identifier.
    pub fn stages(&self, oid: &Oid) -> [Option<&IndexEntry>; 4] {
        Stage::ALL.map(|stage| self.stage_entry(stage, oid))
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Write a value at an address.
    ///
    /// - `Stage(1|2|3)` with an entry stores it and clears stage 0.
    /// - `Stage(0)` with an entry stores it and clears stages 1-3; with
    ///   `None` it clears stage 0.
    /// - `AllStages` with four slots upserts present slots and clears absent
    ///   ones, unless stage 0 and a conflict stage are both present.
    /// - `Default` with an entry is `AllStages` with `(entry, -, -, -)`.
    ///
    /// Any other pairing fails with [`IndexError::TypeMismatch`]. A failed
    /// write leaves the index untouched.
    pub fn set(&mut self, address: Address, value: impl Into<Staged>) -> IndexResult<()> {
        match (address, value.into()) {
            (Address::Stage(stage, oid), Staged::Entry(Some(entry))) if stage.is_conflict() => {
                self.table.stage_mut(stage).insert(oid, entry);
                self.table.stage_mut(Stage::Clean).remove(&oid);
            }
            (Address::Stage(Stage::Clean, oid), Staged::Entry(None)) => {
                self.table.stage_mut(Stage::Clean).remove(&oid);
            }
            (Address::Stage(Stage::Clean, oid), Staged::Entry(Some(entry))) => {
                self.table.stage_mut(Stage::Clean).insert(oid, entry);
                for stage in Stage::CONFLICT {
                    self.table.stage_mut(stage).remove(&oid);
                }
            }
            (Address::AllStages(oid), Staged::Stages(slots)) => self.set_all(oid, slots)?,
            (Address::Default(oid), Staged::Entry(Some(entry))) => {
                self.set_all(oid, [Some(entry), None, None, None])?
            }
            (address, value) => {
                return Err(IndexError::TypeMismatch {
                    expected: address.expected_value(),
                    found: value.shape(),
                })
            }
        }
        Ok(())
    }

    fn set_all(&mut self, oid: Oid, slots: StageSlots) -> IndexResult<()> {
        let [clean, conflict @ ..] = &slots;
        if clean.is_some() && conflict.iter().any(Option::is_some) {
            return Err(IndexError::ConflictingStageAssignment(oid));
        }
        for (stage, slot) in Stage::ALL.into_iter().zip(slots) {
            let map = self.table.stage_mut(stage);
            match slot {
                Some(entry) => {
                    map.insert(oid, entry);
                }
                None => {
                    map.remove(&oid);
                }
            }
        }
        Ok(())
    }

    /// Stage an entry cleanly at stage 0, resolving any conflict for its
    /// identifier.
    pub fn add(&mut self, entry: IndexEntry) -> IndexResult<()> {
        let oid = *entry.oid();
        self.set(Address::Default(oid), entry)
    }

    // ---------------------------------------------------------------
    // Deletes
    // ---------------------------------------------------------------

    /// Remove the entries at an address, returning how many were removed.
    ///
    /// `Default` and `AllStages` clear the identifier from all four stages;
    /// `Stage` clears only that stage. Absent entries are skipped, so
    /// removal is idempotent.
    pub fn remove(&mut self, address: Address) -> usize {
        match address {
            Address::Default(oid) | Address::AllStages(oid) => Stage::ALL
                .into_iter()
                .map(|stage| self.table.stage_mut(stage).remove(&oid))
                .filter(Option::is_some)
                .count(),
            Address::Stage(stage, oid) => {
                usize::from(self.table.stage_mut(stage).remove(&oid).is_some())
            }
        }
    }

    // ---------------------------------------------------------------
    // Iteration and queries
    // ---------------------------------------------------------------

    /// All entries as `(stage, entry)`, stage by stage, each stage in
    /// insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (Stage, &IndexEntry)> + '_ {
        Stage::ALL.into_iter().flat_map(move |stage| {
            self.table
                .stage(stage)
                .iter()
                .map(move |(_, entry)| (stage, entry))
        })
    }

    /// Distinct path names in the index.
    ///
    /// Only stage 0 contributes unless `include_unmerged` is set, in which
    /// case conflicted paths from stages 1-3 are included too.
    pub fn list_files(&self, include_unmerged: bool) -> BTreeSet<String> {
        let stages: &[Stage] = if include_unmerged {
            &Stage::ALL
        } else {
            &[Stage::Clean]
        };
        stages
            .iter()
            .flat_map(|stage| self.table.stage(*stage).iter())
            .map(|(_, entry)| entry.name().to_string())
            .collect()
    }

    /// Total entries across all four stages.
    pub fn size(&self) -> usize {
        Stage::ALL.iter().map(|stage| self.stage_len(*stage)).sum()
    }

    /// Returns `true` if no stage holds any entry.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of entries in one stage.
    pub fn stage_len(&self, stage: Stage) -> usize {
        self.table.stage(stage).len()
    }

    /// Returns `true` if any entry sits in stages 1-3.
    pub fn has_conflicts(&self) -> bool {
        Stage::CONFLICT.iter().any(|stage| self.stage_len(*stage) > 0)
    }

    /// Identifiers with entries in stages 1-3, in first-seen order.
    pub fn conflicted_oids(&self) -> Vec<Oid> {
        let mut seen = HashSet::new();
        Stage::CONFLICT
            .iter()
            .flat_map(|stage| self.table.stage(*stage).iter())
            .filter_map(|(oid, _)| seen.insert(*oid).then_some(*oid))
            .collect()
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    /// Copy the whole table out, in iteration order.
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            version: self.version,
            entries: self
                .table_iter()
                .map(|(stage, oid, entry)| (stage, *oid, entry.clone()))
                .collect(),
        }
    }

    /// Rebuild an index from a snapshot.
    ///
    /// Fails with [`IndexError::ConflictingStageAssignment`] if the snapshot
    /// places an identifier in stage 0 and in a conflict stage.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> IndexResult<Self> {
        let mut index = Self::from_version(snapshot.version);
        for (stage, oid, entry) in snapshot.entries {
            let clashes = if stage.is_conflict() {
                index.table.stage(Stage::Clean).contains(&oid)
            } else {
                index.table.in_conflict(&oid)
            };
            if clashes {
                return Err(IndexError::ConflictingStageAssignment(oid));
            }
            index.table.stage_mut(stage).insert(oid, entry);
        }
        Ok(index)
    }

    fn table_iter(&self) -> impl Iterator<Item = (Stage, &Oid, &IndexEntry)> + '_ {
        Stage::ALL.into_iter().flat_map(move |stage| {
            self.table
                .stage(stage)
                .iter()
                .map(move |(oid, entry)| (stage, oid, entry))
        })
    }
}
