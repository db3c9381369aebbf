//! Merge stages and the per-stage entry tables.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use gitgo_types::Oid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};

/// One of the four slots an entry can occupy.
///
/// Stage 0 is the clean, checked-out state. Stages 1-3 exist only while a
/// merge is unresolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Stage 0: the working tree that was checked out.
    Clean,
    /// Stage 1: the common ancestor of a merge.
    Base,
    /// Stage 2: our side of a merge (typically the current branch).
    Ours,
    /// Stage 3: their side of a merge (typically the other branch).
    Theirs,
}

impl Stage {
    /// All stages in table order.
    pub const ALL: [Stage; 4] = [Stage::Clean, Stage::Base, Stage::Ours, Stage::Theirs];

    /// The three stages that only exist during a conflict.
    pub const CONFLICT: [Stage; 3] = [Stage::Base, Stage::Ours, Stage::Theirs];

    /// Numeric stage, 0 through 3.
    pub const fn number(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Base => 1,
            Self::Ours => 2,
            Self::Theirs => 3,
        }
    }

    /// Returns `true` for stages 1-3.
    pub const fn is_conflict(self) -> bool {
        !matches!(self, Self::Clean)
    }

    pub(crate) const fn slot(self) -> usize {
        self.number() as usize
    }
}

impl TryFrom<u8> for Stage {
    type Error = IndexError;

    fn try_from(n: u8) -> IndexResult<Self> {
        match n {
            0 => Ok(Self::Clean),
            1 => Ok(Self::Base),
            2 => Ok(Self::Ours),
            3 => Ok(Self::Theirs),
            other => Err(IndexError::InvalidAddress(format!(
                "stage {other} out of range 0-3"
            ))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Stage::try_from(n).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug)]
struct Slot {
    seq: u64,
    entry: IndexEntry,
}

/// Insertion-ordered map from identifier to entry for a single stage.
///
/// Replacing an existing key keeps its position; removing and re-inserting
/// moves it to the end.
#[derive(Clone, Debug, Default)]
pub(crate) struct StageMap {
    order: BTreeMap<u64, Oid>,
    slots: HashMap<Oid, Slot>,
    next_seq: u64,
}

impl StageMap {
    pub fn get(&self, oid: &Oid) -> Option<&IndexEntry> {
        self.slots.get(oid).map(|slot| &slot.entry)
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.slots.contains_key(oid)
    }

    /// Insert or replace, returning the previous entry.
    pub fn insert(&mut self, oid: Oid, entry: IndexEntry) -> Option<IndexEntry> {
        if let Some(slot) = self.slots.get_mut(&oid) {
            return Some(std::mem::replace(&mut slot.entry, entry));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, oid);
        self.slots.insert(oid, Slot { seq, entry });
        None
    }

    /// Remove an entry. Absent keys are a no-op.
    pub fn remove(&mut self, oid: &Oid) -> Option<IndexEntry> {
        let slot = self.slots.remove(oid)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &IndexEntry)> + '_ {
        self.order
            .values()
            .filter_map(move |oid| self.slots.get(oid).map(|slot| (oid, &slot.entry)))
    }
}

/// The four stage maps, indexed by [`Stage`].
#[derive(Clone, Debug, Default)]
pub(crate) struct StageTable {
    stages: [StageMap; 4],
}

impl StageTable {
    pub fn stage(&self, stage: Stage) -> &StageMap {
        &self.stages[stage.slot()]
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageMap {
        &mut self.stages[stage.slot()]
    }

    /// Returns `true` if any of stages 1-3 hold the identifier.
    pub fn in_conflict(&self, oid: &Oid) -> bool {
        Stage::CONFLICT
            .iter()
            .any(|stage| self.stage(*stage).contains(oid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgo_types::ContentHasher;

    fn entry(name: &str) -> (Oid, IndexEntry) {
        let oid = ContentHasher::BLOB.hash(name.as_bytes());
        (oid, IndexEntry::blob(name, oid, name.len() as u64))
    }

    fn names(map: &StageMap) -> Vec<String> {
        map.iter().map(|(_, e)| e.name().to_string()).collect()
    }

    #[test]
    fn stage_numbers_roundtrip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::try_from(stage.number()).unwrap(), stage);
        }
        assert!(matches!(Stage::try_from(4), Err(IndexError::InvalidAddress(_))));
        assert!(!Stage::Clean.is_conflict());
        assert!(Stage::CONFLICT.iter().all(|s| s.is_conflict()));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut map = StageMap::default();
        for name in ["c", "a", "b"] {
            let (oid, e) = entry(name);
            map.insert(oid, e);
        }
        assert_eq!(names(&map), ["c", "a", "b"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut map = StageMap::default();
        let (a, ea) = entry("a");
        let (b, eb) = entry("b");
        map.insert(a, ea.clone());
        map.insert(b, eb);

        let renamed = IndexEntry::blob("a-renamed", a, 1);
        assert_eq!(map.insert(a, renamed), Some(ea));
        assert_eq!(names(&map), ["a-renamed", "b"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn reinsert_after_remove_moves_to_end() {
        let mut map = StageMap::default();
        let (a, ea) = entry("a");
        let (b, eb) = entry("b");
        map.insert(a, ea.clone());
        map.insert(b, eb);
        map.remove(&a);
        map.insert(a, ea);
        assert_eq!(names(&map), ["b", "a"]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut map = StageMap::default();
        let (a, _) = entry("a");
        assert!(map.remove(&a).is_none());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn table_conflict_lookup() {
        let mut table = StageTable::default();
        let (a, ea) = entry("a");
        assert!(!table.in_conflict(&a));
        table.stage_mut(Stage::Theirs).insert(a, ea);
        assert!(table.in_conflict(&a));
        assert!(!table.stage(Stage::Clean).contains(&a));
    }
}
