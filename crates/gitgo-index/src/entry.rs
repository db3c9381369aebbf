//! Index entry types: one staged path's metadata and content reference.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::Metadata;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use gitgo_types::Oid;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// What an index entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Symlink,
    Gitlink,
    Module,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Symlink => "symlink",
            Self::Gitlink => "gitlink",
            Self::Module => "module",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "symlink" => Ok(Self::Symlink),
            "gitlink" => Ok(Self::Gitlink),
            "module" => Ok(Self::Module),
            other => Err(IndexError::InvalidField(format!("entry type {other:?}"))),
        }
    }
}

/// Permission bits recorded for an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileMode {
    /// `0755`
    Executable,
    /// `0644`
    Regular,
    /// `0`, used for symlinks and submodules.
    Unset,
}

impl FileMode {
    /// Octal permission value.
    pub fn bits(&self) -> u32 {
        match self {
            Self::Executable => 0o755,
            Self::Regular => 0o644,
            Self::Unset => 0,
        }
    }

    /// Parse from an octal permission value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0o755 => Some(Self::Executable),
            0o644 => Some(Self::Regular),
            0 => Some(Self::Unset),
            _ => None,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("0"),
            other => write!(f, "{:04o}", other.bits()),
        }
    }
}

impl FromStr for FileMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u32::from_str_radix(s, 8)
            .ok()
            .and_then(Self::from_bits)
            .ok_or_else(|| IndexError::InvalidField(format!("file mode {s:?}")))
    }
}

/// Per-entry flags carried by the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexFlag {
    AssumeValid,
    SkipWorktree,
    IntentToAdd,
}

impl IndexFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssumeValid => "assume-valid",
            Self::SkipWorktree => "skip-worktree",
            Self::IntentToAdd => "intent-to-add",
        }
    }
}

impl fmt::Display for IndexFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexFlag {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assume-valid" => Ok(Self::AssumeValid),
            "skip-worktree" => Ok(Self::SkipWorktree),
            "intent-to-add" => Ok(Self::IntentToAdd),
            other => Err(IndexError::InvalidField(format!("flag {other:?}"))),
        }
    }
}

/// A filesystem timestamp relative to the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                let secs = -(d.as_secs() as i64);
                match d.subsec_nanos() {
                    0 => Self::new(secs, 0),
                    n => Self::new(secs - 1, 1_000_000_000 - n),
                }
            }
        }
    }
}

/// An entry in the staging index.
///
/// Entries are values: fields are read through accessors and a changed entry
/// is a new entry. The `with_*` methods consume `self` and return the
/// modified copy. Ordering compares `name`, then `oid`, then the remaining
/// fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexEntry {
    name: String,
    oid: Oid,
    entry_type: EntryType,
    mode: FileMode,
    ctime: Timestamp,
    mtime: Timestamp,
    dev: u64,
    ino: u64,
    uid: u32,
    gid: u32,
    flags: BTreeSet<IndexFlag>,
    size: u64,
}

impl IndexEntry {
    /// Create an entry with zeroed filesystem metadata and no flags.
    pub fn new(
        name: impl Into<String>,
        entry_type: EntryType,
        oid: Oid,
        mode: FileMode,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            oid,
            entry_type,
            mode,
            ctime: Timestamp::default(),
            mtime: Timestamp::default(),
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            flags: BTreeSet::new(),
            size,
        }
    }

    /// Shorthand for a regular `0644` blob entry.
    pub fn blob(name: impl Into<String>, oid: Oid, size: u64) -> Self {
        Self::new(name, EntryType::Blob, oid, FileMode::Regular, size)
    }

    /// Build an entry from the metadata of the file it describes.
    ///
    /// Symlinks get [`EntryType::Symlink`] and [`FileMode::Unset`]; any
    /// executable bit makes a file [`FileMode::Executable`]. Device, inode
    /// and owner fields are only populated on Unix.
    pub fn from_metadata(name: impl Into<String>, oid: Oid, meta: &Metadata) -> Self {
        let (entry_type, mode) = if meta.file_type().is_symlink() {
            (EntryType::Symlink, FileMode::Unset)
        } else if is_executable(meta) {
            (EntryType::Blob, FileMode::Executable)
        } else {
            (EntryType::Blob, FileMode::Regular)
        };
        let mut entry = Self::new(name, entry_type, oid, mode, meta.len());

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            entry.ctime = Timestamp::new(meta.ctime(), meta.ctime_nsec() as u32);
            entry.mtime = Timestamp::new(meta.mtime(), meta.mtime_nsec() as u32);
            entry.dev = meta.dev();
            entry.ino = meta.ino();
            entry.uid = meta.uid();
            entry.gid = meta.gid();
        }
        #[cfg(not(unix))]
        {
            entry.ctime = meta.created().map(Timestamp::from).unwrap_or_default();
            entry.mtime = meta.modified().map(Timestamp::from).unwrap_or_default();
        }

        entry
    }

    pub fn with_times(mut self, ctime: Timestamp, mtime: Timestamp) -> Self {
        self.ctime = ctime;
        self.mtime = mtime;
        self
    }

    pub fn with_device(mut self, dev: u64, ino: u64) -> Self {
        self.dev = dev;
        self.ino = ino;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_flag(mut self, flag: IndexFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = IndexFlag>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn ctime(&self) -> Timestamp {
        self.ctime
    }

    pub fn mtime(&self) -> Timestamp {
        self.mtime
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn flags(&self) -> &BTreeSet<IndexFlag> {
        &self.flags
    }

    pub fn has_flag(&self, flag: IndexFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(unix)]
fn is_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgo_types::ContentHasher;

    fn oid(content: &str) -> Oid {
        ContentHasher::BLOB.hash(content.as_bytes())
    }

    #[test]
    fn new_entry_has_no_flags_or_stat() {
        let entry = IndexEntry::blob("test.txt", oid("test"), 100);
        assert!(entry.flags().is_empty());
        assert_eq!(entry.mode(), FileMode::Regular);
        assert_eq!(entry.entry_type(), EntryType::Blob);
        assert_eq!(entry.dev(), 0);
        assert_eq!(entry.mtime(), Timestamp::default());
    }

    #[test]
    fn with_methods_return_new_value() {
        let base = IndexEntry::blob("a.txt", oid("a"), 1);
        let flagged = base.clone().with_flag(IndexFlag::SkipWorktree);
        assert!(!base.has_flag(IndexFlag::SkipWorktree));
        assert!(flagged.has_flag(IndexFlag::SkipWorktree));
        assert_ne!(base, flagged);

        let owned = base.with_owner(1000, 100).with_device(7, 42);
        assert_eq!((owned.uid(), owned.gid()), (1000, 100));
        assert_eq!((owned.dev(), owned.ino()), (7, 42));
    }

    #[test]
    fn ordering_leads_with_name_then_oid() {
        let a = IndexEntry::blob("a.txt", oid("zzz"), 10);
        let b = IndexEntry::blob("b.txt", oid("aaa"), 1);
        assert!(a < b);

        let (lo, hi) = {
            let x = oid("x");
            let y = oid("y");
            if x < y { (x, y) } else { (y, x) }
        };
        let first = IndexEntry::blob("same", lo, 99);
        let second = IndexEntry::blob("same", hi, 0);
        assert!(first < second);
    }

    #[test]
    fn file_mode_text_forms() {
        assert_eq!(FileMode::Executable.to_string(), "0755");
        assert_eq!(FileMode::Regular.to_string(), "0644");
        assert_eq!(FileMode::Unset.to_string(), "0");
        assert_eq!("755".parse::<FileMode>().unwrap(), FileMode::Executable);
        assert_eq!("0644".parse::<FileMode>().unwrap(), FileMode::Regular);
        assert_eq!("0".parse::<FileMode>().unwrap(), FileMode::Unset);
        assert!("0600".parse::<FileMode>().is_err());
        assert!("rwx".parse::<FileMode>().is_err());
    }

    #[test]
    fn entry_type_and_flag_parse() {
        assert_eq!("gitlink".parse::<EntryType>().unwrap(), EntryType::Gitlink);
        assert!("tree".parse::<EntryType>().is_err());
        assert_eq!(
            "intent-to-add".parse::<IndexFlag>().unwrap(),
            IndexFlag::IntentToAdd
        );
        assert!(matches!(
            "sticky".parse::<IndexFlag>(),
            Err(IndexError::InvalidField(_))
        ));
    }

    #[test]
    fn timestamp_from_system_time() {
        let t = UNIX_EPOCH + std::time::Duration::new(5, 250);
        assert_eq!(Timestamp::from(t), Timestamp::new(5, 250));

        let before = UNIX_EPOCH - std::time::Duration::new(1, 500_000_000);
        assert_eq!(Timestamp::from(before), Timestamp::new(-2, 500_000_000));
    }

    #[test]
    fn from_metadata_reads_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"hello").unwrap();
        let meta = std::fs::symlink_metadata(&path).unwrap();

        let entry = IndexEntry::from_metadata("file.txt", oid("hello"), &meta);
        assert_eq!(entry.size(), 5);
        assert_eq!(entry.entry_type(), EntryType::Blob);
        assert_eq!(entry.name(), "file.txt");
    }

    #[cfg(unix)]
    #[test]
    fn from_metadata_detects_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let meta = std::fs::symlink_metadata(&path).unwrap();

        let entry = IndexEntry::from_metadata("run.sh", oid("run"), &meta);
        assert_eq!(entry.mode(), FileMode::Executable);
        assert_ne!(entry.ino(), 0);
    }
}
