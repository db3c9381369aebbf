//! TOML configuration for opening a persisted index.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::index::IndexVersion;

/// Default location of the index file, relative to the repository root.
pub const DEFAULT_INDEX_PATH: &str = ".gitgo/index";

/// Configuration for opening a persisted index.
///
/// Loaded from TOML; every key is optional:
///
/// ```toml
/// version = 3
/// path = ".gitgo/index"
/// fsync = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Format version for newly created indexes (2, 3 or 4).
    pub version: u32,
    /// Where the index is stored.
    pub path: PathBuf,
    /// Whether file-backed saves `fsync` before replacing the old file.
    pub fsync: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            version: IndexVersion::default().number(),
            path: PathBuf::from(DEFAULT_INDEX_PATH),
            fsync: false,
        }
    }
}

impl IndexConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> IndexResult<Self> {
        toml::from_str(text).map_err(|e| IndexError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> IndexResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the configured version.
    pub fn validate(&self) -> IndexResult<IndexVersion> {
        IndexVersion::try_from(self.version)
    }
}
