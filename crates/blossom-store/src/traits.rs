use blossom_types::{AccessRecord, BlobHash, BlobRecord, UnixSeconds};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Aggregate numbers over the blob table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub blob_count: u64,
    pub total_size: u64,
}

/// Persistent metadata backing the blob store: one table of blob records and
/// one of last-access timestamps.
///
/// Implementations must satisfy these invariants:
/// - A blob row, once inserted, is never updated. Inserting a hash that
///   already exists keeps the original row.
/// - `remove` deletes the blob row and its access row atomically; on failure
///   neither is removed.
/// - No connection or lock is held between calls.
pub trait MetadataIndex: Send + Sync {
    /// Look up the record for `hash`.
    fn get(&self, hash: &BlobHash) -> StoreResult<Option<BlobRecord>>;

    /// Insert `record` unless a row for its hash exists, and return the row
    /// that is stored afterwards (the pre-existing one on conflict).
    fn insert(&self, record: &BlobRecord) -> StoreResult<BlobRecord>;

    /// Delete the blob row and access row for `hash` in one transaction.
    /// Returns `true` if a blob row existed.
    fn remove(&self, hash: &BlobHash) -> StoreResult<bool>;

    /// Upsert the last-access timestamp for `hash`.
    fn touch(&self, hash: &BlobHash, at: UnixSeconds) -> StoreResult<()>;

    /// Read the last-access timestamp for `hash`.
    fn last_accessed(&self, hash: &BlobHash) -> StoreResult<Option<AccessRecord>>;

    /// Count and total size of all blob rows.
    fn stats(&self) -> StoreResult<IndexStats>;
}
