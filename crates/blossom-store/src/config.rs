use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_BLOB_SIZE: u64 = 100 * 1024 * 1024;

/// Where and how the blob store keeps its data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStoreConfig {
    /// Directory holding one file per blob, named by its hex hash.
    pub storage_root: PathBuf,
    /// SQLite database file for the metadata index.
    pub database_path: PathBuf,
    /// Uploads larger than this many bytes are rejected while streaming.
    pub max_blob_size: u64,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./data/blobs"),
            database_path: PathBuf::from("./data/sqlite.db"),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
        }
    }
}

impl BlobStoreConfig {
    /// Config rooted entirely under `dir`, as used by tests and `--data-dir`.
    pub fn under(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            storage_root: dir.join("blobs"),
            database_path: dir.join("sqlite.db"),
            ..Self::default()
        }
    }
}
