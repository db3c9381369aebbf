//! Addressing forms for reading and writing the index.
//!
//! Every read, write and delete names its target with an [`Address`]. Writes
//! carry a [`Staged`] value whose shape must fit the address, and reads
//! return a [`Lookup`] of the matching shape.

use std::fmt;
use std::str::FromStr;

use gitgo_types::Oid;

use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};
use crate::stage::Stage;

/// One optional entry per stage, in stage order.
pub type StageSlots = [Option<IndexEntry>; 4];

/// Where in the stage table an operation applies.
///
/// Textual form: `<oid>`, `<stage>:<oid>` or `*:<oid>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// The identifier at stage 0.
    Default(Oid),
    /// The identifier at one explicit stage.
    Stage(Stage, Oid),
    /// The identifier across all four stages.
    AllStages(Oid),
}

impl Address {
    /// Build an explicit-stage address from a raw stage number.
    pub fn stage(stage: u8, oid: Oid) -> IndexResult<Self> {
        Ok(Self::Stage(Stage::try_from(stage)?, oid))
    }

    /// The identifier this address names.
    pub fn oid(&self) -> &Oid {
        match self {
            Self::Default(oid) | Self::Stage(_, oid) | Self::AllStages(oid) => oid,
        }
    }

    /// Describes the value shape a write to this address accepts.
    pub(crate) fn expected_value(&self) -> &'static str {
        match self {
            Self::Default(_) | Self::Stage(Stage::Base | Stage::Ours | Stage::Theirs, _) => {
                "a single entry"
            }
            Self::Stage(Stage::Clean, _) => "a single entry or absent",
            Self::AllStages(_) => "a 4-slot stage tuple",
        }
    }
}

impl From<Oid> for Address {
    fn from(oid: Oid) -> Self {
        Self::Default(oid)
    }
}

impl From<(Stage, Oid)> for Address {
    fn from((stage, oid): (Stage, Oid)) -> Self {
        Self::Stage(stage, oid)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(oid) => write!(f, "{oid}"),
            Self::Stage(stage, oid) => write!(f, "{stage}:{oid}"),
            Self::AllStages(oid) => write!(f, "*:{oid}"),
        }
    }
}

impl FromStr for Address {
    type Err = IndexError;

    fn from_str(s: &str) -> IndexResult<Self> {
        let parse_oid = |text: &str| {
            Oid::from_hex(text).map_err(|e| IndexError::InvalidAddress(format!("{s:?}: {e}")))
        };
        match s.split_once(':') {
            None => Ok(Self::Default(parse_oid(s)?)),
            Some(("*", oid)) => Ok(Self::AllStages(parse_oid(oid)?)),
            Some((stage, oid)) => {
                let n: u8 = stage.parse().map_err(|_| {
                    IndexError::InvalidAddress(format!("{s:?}: stage must be 0-3 or '*'"))
                })?;
                Self::stage(n, parse_oid(oid)?)
            }
        }
    }
}

/// A value written to the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staged {
    /// A single entry, or `None` to clear a stage-0 slot.
    Entry(Option<IndexEntry>),
    /// One optional entry per stage.
    Stages(StageSlots),
}

impl Staged {
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            Self::Entry(Some(_)) => "a single entry",
            Self::Entry(None) => "an absent entry",
            Self::Stages(_) => "a 4-slot stage tuple",
        }
    }
}

impl From<IndexEntry> for Staged {
    fn from(entry: IndexEntry) -> Self {
        Self::Entry(Some(entry))
    }
}

impl From<Option<IndexEntry>> for Staged {
    fn from(entry: Option<IndexEntry>) -> Self {
        Self::Entry(entry)
    }
}

impl From<StageSlots> for Staged {
    fn from(slots: StageSlots) -> Self {
        Self::Stages(slots)
    }
}

/// The result of reading an [`Address`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Result of a stage-0 or single-stage read.
    Entry(Option<&'a IndexEntry>),
    /// Result of an all-stages read, in stage order.
    Stages([Option<&'a IndexEntry>; 4]),
}

impl<'a> Lookup<'a> {
    /// The single entry read, or the stage-0 slot of an all-stages read.
    pub fn entry(&self) -> Option<&'a IndexEntry> {
        match self {
            Self::Entry(entry) => *entry,
            Self::Stages(slots) => slots[0],
        }
    }

    /// The four slots of an all-stages read.
    pub fn stages(&self) -> Option<[Option<&'a IndexEntry>; 4]> {
        match self {
            Self::Entry(_) => None,
            Self::Stages(slots) => Some(*slots),
        }
    }

    /// Clone the looked-up entries out of the index.
    pub fn cloned(&self) -> Staged {
        match self {
            Self::Entry(entry) => Staged::Entry(entry.cloned()),
            Self::Stages(slots) => Staged::Stages(slots.map(|slot| slot.cloned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgo_types::ContentHasher;

    fn oid() -> Oid {
        ContentHasher::BLOB.hash(b"address")
    }

    #[test]
    fn parses_all_forms() {
        let id = oid();
        assert_eq!(id.to_hex().parse::<Address>().unwrap(), Address::Default(id));
        assert_eq!(
            format!("2:{id}").parse::<Address>().unwrap(),
            Address::Stage(Stage::Ours, id)
        );
        assert_eq!(
            format!("*:{id}").parse::<Address>().unwrap(),
            Address::AllStages(id)
        );
    }

    #[test]
    fn display_parses_back() {
        let id = oid();
        for address in [
            Address::Default(id),
            Address::Stage(Stage::Base, id),
            Address::AllStages(id),
        ] {
            assert_eq!(address.to_string().parse::<Address>().unwrap(), address);
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        let id = oid();
        for bad in [
            format!("4:{id}"),
            format!("x:{id}"),
            format!("-1:{id}"),
            "1:abc".to_string(),
            "not-an-oid".to_string(),
            format!("1:2:{id}"),
        ] {
            assert!(
                matches!(bad.parse::<Address>(), Err(IndexError::InvalidAddress(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn stage_constructor_validates() {
        assert!(Address::stage(3, oid()).is_ok());
        assert!(matches!(
            Address::stage(9, oid()),
            Err(IndexError::InvalidAddress(_))
        ));
    }

    #[test]
    fn lookup_accessors() {
        let entry = IndexEntry::blob("a", oid(), 1);
        let single = Lookup::Entry(Some(&entry));
        assert_eq!(single.entry(), Some(&entry));
        assert!(single.stages().is_none());

        let all = Lookup::Stages([None, Some(&entry), None, None]);
        assert_eq!(all.entry(), None);
        assert_eq!(all.stages().unwrap()[1], Some(&entry));
        assert_eq!(
            all.cloned(),
            Staged::Stages([None, Some(entry.clone()), None, None])
        );
    }
}
