//! File-backed index storage.
//!
//! A snapshot file holds one framed, checksummed snapshot:
//!
//! ```text
//! [4 bytes: magic "GGIX"]
//! [4 bytes: frame format (little-endian u32)]
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized IndexSnapshot)]
//! ```
//!
//! Saves go through a temporary file in the target directory that is renamed
//! over the old file, so readers see either the previous or the new snapshot.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::backend::IndexBackend;
use crate::error::{IndexError, IndexResult};
use crate::snapshot::IndexSnapshot;

const MAGIC: &[u8; 4] = b"GGIX";
const FRAME_FORMAT: u32 = 1;
/// Magic + format + length + CRC.
const HEADER_SIZE: usize = 16;

/// Stores each index as a snapshot file at its path.
#[derive(Clone, Debug, Default)]
pub struct SnapshotFileBackend {
    fsync: bool,
}

impl SnapshotFileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `fsync` the snapshot before renaming it into place.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    fn encode(snapshot: &IndexSnapshot) -> IndexResult<Vec<u8>> {
        let payload =
            bincode::serialize(snapshot).map_err(|e| IndexError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            IndexError::Serialization(format!("snapshot too large: {} bytes", payload.len()))
        })?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FRAME_FORMAT.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    fn decode(path: &Path, bytes: &[u8]) -> IndexResult<IndexSnapshot> {
        let corrupt = |reason: String| {
            warn!(path = %path.display(), %reason, "rejecting index snapshot");
            IndexError::CorruptSnapshot {
                path: path.to_path_buf(),
                reason,
            }
        };

        if bytes.len() < HEADER_SIZE {
            return Err(corrupt(format!(
                "file is {} bytes, shorter than header",
                bytes.len()
            )));
        }
        let (header, payload) = bytes.split_at(HEADER_SIZE);
        if &header[0..4] != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        let word = |at: usize| {
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        let format = word(4);
        let length = word(8) as usize;
        let expected_crc = word(12);

        if format != FRAME_FORMAT {
            return Err(corrupt(format!("unsupported frame format {format}")));
        }
        if length != payload.len() {
            return Err(corrupt(format!(
                "payload length {} does not match header length {length}",
                payload.len()
            )));
        }
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(corrupt(format!(
                "CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        bincode::deserialize(payload).map_err(|e| corrupt(format!("undecodable payload: {e}")))
    }
}

impl IndexBackend for SnapshotFileBackend {
    fn load(&self, path: &Path) -> IndexResult<Option<IndexSnapshot>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index snapshot on disk");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = Self::decode(path, &bytes)?;
        debug!(path = %path.display(), entries = snapshot.len(), "loaded index snapshot");
        Ok(Some(snapshot))
    }

    fn save(&self, path: &Path, snapshot: &IndexSnapshot) -> IndexResult<()> {
        let dir = parent_dir(path);
        fs::create_dir_all(&dir)?;

        let buf = Self::encode(snapshot)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&buf)?;
        tmp.flush()?;
        if self.fsync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

        debug!(
            path = %path.display(),
            entries = snapshot.len(),
            bytes = buf.len(),
            "saved index snapshot"
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{IndexEntry, IndexFlag, Timestamp};
    use crate::index::IndexVersion;
    use crate::stage::Stage;
    use gitgo_types::ContentHasher;

    fn sample() -> IndexSnapshot {
        let a = ContentHasher::BLOB.hash(b"a");
        let c = ContentHasher::BLOB.hash(b"c");
        IndexSnapshot {
            version: IndexVersion::V4,
            entries: vec![
                (
                    Stage::Clean,
                    a,
                    IndexEntry::blob("a.txt", a, 1)
                        .with_times(Timestamp::new(10, 1), Timestamp::new(20, 2))
                        .with_flag(IndexFlag::AssumeValid),
                ),
                (Stage::Ours, c, IndexEntry::blob("c.txt", c, 1)),
            ],
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index");
        let backend = SnapshotFileBackend::new();

        backend.save(&path, &sample()).unwrap();
        assert_eq!(backend.load(&path).unwrap(), Some(sample()));
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SnapshotFileBackend::new();
        assert!(backend.load(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let backend = SnapshotFileBackend::new().with_fsync(true);

        backend.save(&path, &sample()).unwrap();
        backend
            .save(&path, &IndexSnapshot::empty(IndexVersion::V2))
            .unwrap();
        let loaded = backend.load(&path).unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.version, IndexVersion::V2);
    }

    #[test]
    fn crc_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let backend = SnapshotFileBackend::new();
        backend.save(&path, &sample()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            backend.load(&path),
            Err(IndexError::CorruptSnapshot { reason, .. }) if reason.contains("CRC")
        ));
    }

    #[test]
    fn truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let backend = SnapshotFileBackend::new();
        backend.save(&path, &sample()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            backend.load(&path),
            Err(IndexError::CorruptSnapshot { .. })
        ));

        fs::write(&path, &bytes[..6]).unwrap();
        assert!(matches!(
            backend.load(&path),
            Err(IndexError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn foreign_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        // A real git index starts with "DIRC".
        fs::write(&path, b"DIRC\0\0\0\x02\0\0\0\0\0\0\0\0").unwrap();
        assert!(matches!(
            SnapshotFileBackend::new().load(&path),
            Err(IndexError::CorruptSnapshot { reason, .. }) if reason == "bad magic"
        ));
    }
}
