use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use blossom_types::{AccessRecord, BlobHash, BlobRecord, UnixSeconds};

use crate::error::{StoreError, StoreResult};
use crate::traits::{IndexStats, MetadataIndex};

#[derive(Default)]
struct Tables {
    blobs: HashMap<BlobHash, BlobRecord>,
    accessed: HashMap<BlobHash, UnixSeconds>,
}

/// In-memory, HashMap-based metadata index.
///
/// Intended for tests and embedding. Both tables sit behind one `RwLock`, so
/// `remove` is atomic across them.
pub struct InMemoryMetadataIndex {
    tables: RwLock<Tables>,
}

impl InMemoryMetadataIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of blob rows.
    pub fn len(&self) -> usize {
        self.read().map(|t| t.blobs.len()).unwrap_or(0)
    }

    /// Returns `true` if there are no blob rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("metadata lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("metadata lock poisoned".into()))
    }
}

impl Default for InMemoryMetadataIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataIndex for InMemoryMetadataIndex {
    fn get(&self, hash: &BlobHash) -> StoreResult<Option<BlobRecord>> {
        Ok(self.read()?.blobs.get(hash).cloned())
    }

    fn insert(&self, record: &BlobRecord) -> StoreResult<BlobRecord> {
        let mut tables = self.write()?;
        let stored = tables
            .blobs
            .entry(record.hash)
            .or_insert_with(|| record.clone());
        Ok(stored.clone())
    }

    fn remove(&self, hash: &BlobHash) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let existed = tables.blobs.remove(hash).is_some();
        tables.accessed.remove(hash);
        Ok(existed)
    }

    fn touch(&self, hash: &BlobHash, at: UnixSeconds) -> StoreResult<()> {
        self.write()?.accessed.insert(*hash, at);
        Ok(())
    }

    fn last_accessed(&self, hash: &BlobHash) -> StoreResult<Option<AccessRecord>> {
        Ok(self.read()?.accessed.get(hash).map(|at| AccessRecord {
            hash: *hash,
            last_accessed_at: *at,
        }))
    }

    fn stats(&self) -> StoreResult<IndexStats> {
        let tables = self.read()?;
        Ok(IndexStats {
            blob_count: tables.blobs.len() as u64,
            total_size: tables.blobs.values().map(|r| r.size).sum(),
        })
    }
}

impl std::fmt::Debug for InMemoryMetadataIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetadataIndex")
            .field("blob_count", &self.len())
            .finish()
    }
}
