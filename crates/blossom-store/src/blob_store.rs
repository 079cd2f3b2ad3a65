use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use blossom_crypto::ContentHasher;
use blossom_types::{unix_now, BlobHash, BlobRecord, ByteRange};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::BlobStoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::mime;
use crate::sqlite::SqliteMetadataIndex;
use crate::traits::{IndexStats, MetadataIndex};

/// Subdirectory of the storage root where uploads are staged.
const STAGING_DIR: &str = ".staging";

/// Chunk size used when streaming blob content back out.
const READ_CHUNK: usize = 64 * 1024;

/// A boxed stream of blob bytes.
pub type BlobStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Read-time view of a blob: what to send and how much of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobContentView {
    pub hash: BlobHash,
    pub size: u64,
    pub mime_type: String,
    /// Satisfiable byte range requested by the client, if any.
    pub range: Option<ByteRange>,
}

impl BlobContentView {
    /// Number of bytes the response body will carry.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.size, |r| r.length())
    }

    /// `Content-Range` header value for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.range.map(|r| r.content_range(self.size))
    }
}

/// Result of [`BlobStore::store_with_outcome`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOutcome {
    pub record: BlobRecord,
    /// `true` if this call created the record, `false` if it already existed.
    pub created: bool,
}

/// Content-addressed blob storage.
///
/// Each blob lives at `storage_root/<hex hash>` and has exactly one row in
/// the [`MetadataIndex`]. Uploads are written to a staging file while being
/// hashed, then renamed into place, so a partially written blob is never
/// visible under its final name.
pub struct BlobStore {
    config: BlobStoreConfig,
    index: Arc<dyn MetadataIndex>,
}

impl BlobStore {
    /// Open the store described by `config`, backed by SQLite.
    pub fn open(config: BlobStoreConfig) -> StoreResult<Self> {
        let index = SqliteMetadataIndex::open(&config.database_path)?;
        Self::with_index(config, Arc::new(index))
    }

    /// Open the store with a caller-supplied metadata index.
    pub fn with_index(config: BlobStoreConfig, index: Arc<dyn MetadataIndex>) -> StoreResult<Self> {
        std::fs::create_dir_all(config.storage_root.join(STAGING_DIR))?;
        info!(root = %config.storage_root.display(), "Opened blob store");
        Ok(Self { config, index })
    }

    pub fn config(&self) -> &BlobStoreConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn MetadataIndex> {
        &self.index
    }

    /// Final location of the blob with `hash`.
    pub fn blob_path(&self, hash: &BlobHash) -> PathBuf {
        self.config.storage_root.join(hash.to_hex())
    }

    fn staging_dir(&self) -> PathBuf {
        self.config.storage_root.join(STAGING_DIR)
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Stream `body` into the store.
    ///
    /// The digest is computed while writing. If `expected` is given and does
    /// not match, nothing is kept. If a blob with the same digest already
    /// exists its record is returned unchanged. The staging file is removed
    /// on every exit path that does not move it into place.
    pub async fn store<S>(
        &self,
        body: S,
        declared_mime: Option<&str>,
        uploader_pubkey: Option<&str>,
        expected: Option<&str>,
    ) -> StoreResult<BlobRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        self.store_with_outcome(body, declared_mime, uploader_pubkey, expected)
            .await
            .map(|outcome| outcome.record)
    }

    /// Like [`Self::store`], but also reports whether the record is new.
    pub async fn store_with_outcome<S>(
        &self,
        mut body: S,
        declared_mime: Option<&str>,
        uploader_pubkey: Option<&str>,
        expected: Option<&str>,
    ) -> StoreResult<StoreOutcome>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        let staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".tmp")
            .tempfile_in(self.staging_dir())?;
        // The TempPath deletes the staging file when dropped.
        let (std_file, temp_path) = staged.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let limit = self.config.max_blob_size;
        let mut hasher = ContentHasher::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if hasher.bytes_seen() + chunk.len() as u64 > limit {
                debug!(limit, "Upload exceeded size limit");
                return Err(StoreError::TooLarge { limit });
            }
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let size = hasher.bytes_seen();
        let hash = hasher.finalize();

        if let Some(expected) = expected {
            let expected = expected.trim().to_ascii_lowercase();
            if expected != hash.to_hex() {
                return Err(StoreError::HashMismatch {
                    expected,
                    computed: hash,
                });
            }
        }

        let final_path = self.blob_path(&hash);
        if let Some(existing) = self.index.get(&hash)? {
            if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
                debug!(%hash, "Blob already stored");
                return Ok(StoreOutcome {
                    record: existing,
                    created: false,
                });
            }
            warn!(%hash, "Record exists without backing file, restoring content");
            temp_path
                .persist(&final_path)
                .map_err(|e| StoreError::Io(e.error))?;
            return Ok(StoreOutcome {
                record: existing,
                created: false,
            });
        }

        temp_path
            .persist(&final_path)
            .map_err(|e| StoreError::Io(e.error))?;

        let record = BlobRecord {
            hash,
            size,
            mime_type: declared_mime
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            uploaded_at: unix_now(),
            uploader_pubkey: uploader_pubkey.map(str::to_string),
        };
        let stored = self.index.insert(&record).map_err(|e| {
            warn!(%hash, error = %e, "Blob file placed but metadata insert failed");
            e
        })?;

        // A concurrent upload of the same bytes may have inserted first.
        let created = stored == record;
        info!(%hash, size, created, "Stored blob");
        Ok(StoreOutcome {
            record: stored,
            created,
        })
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Look up a blob whose metadata and backing file are both present.
    ///
    /// Malformed hashes and metadata without a readable file yield `None`.
    pub async fn find(&self, hash: &str) -> StoreResult<Option<BlobRecord>> {
        let Ok(hash) = BlobHash::parse(hash) else {
            return Ok(None);
        };
        let Some(record) = self.index.get(&hash)? else {
            return Ok(None);
        };

        // The file must open, not merely exist.
        let file = match tokio::fs::File::open(self.blob_path(&hash)).await {
            Ok(file) => file,
            Err(e) => {
                warn!(%hash, error = %e, "Metadata present but blob file missing or unreadable");
                return Ok(None);
            }
        };
        match file.metadata().await {
            Ok(meta) if meta.is_file() => Ok(Some(record)),
            Ok(_) => {
                warn!(%hash, "Blob path is not a regular file");
                Ok(None)
            }
            Err(e) => {
                warn!(%hash, error = %e, "Blob file metadata unreadable");
                Ok(None)
            }
        }
    }

    /// Resolve what to serve for `hash`.
    ///
    /// `range` is the raw `Range` header; anything unsatisfiable yields a
    /// full-content view. `extension` is the advisory suffix from the path.
    pub async fn read(
        &self,
        hash: &str,
        range: Option<&str>,
        extension: Option<&str>,
    ) -> StoreResult<Option<BlobContentView>> {
        let Some(record) = self.find(hash).await? else {
            return Ok(None);
        };

        let mime_type = mime::resolve(&record, extension, &self.blob_path(&record.hash));
        let range = range
            .filter(|h| !h.trim().is_empty())
            .and_then(|h| {
                let parsed = ByteRange::parse(h, record.size);
                if parsed.is_none() {
                    debug!(hash = %record.hash, header = h, "Ignoring unsatisfiable range");
                }
                parsed
            })
            .filter(|r| r.is_valid(record.size));

        Ok(Some(BlobContentView {
            hash: record.hash,
            size: record.size,
            mime_type,
            range,
        }))
    }

    /// Open a byte stream over the content described by `view`.
    pub async fn open_content(&self, view: &BlobContentView) -> StoreResult<BlobStream> {
        let mut file = tokio::fs::File::open(self.blob_path(&view.hash)).await?;
        let start = view.range.map_or(0, |r| r.start);
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        let reader = file.take(view.content_length());

        let chunks = stream::unfold(Some(reader), |state| async move {
            let mut reader = state?;
            let mut buf = BytesMut::with_capacity(READ_CHUNK);
            match reader.read_buf(&mut buf).await {
                Ok(0) => None,
                Ok(_) => Some((Ok(buf.freeze()), Some(reader))),
                Err(e) => Some((Err(e), None)),
            }
        });
        Ok(Box::pin(chunks))
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Delete a blob. Returns `false` if no record existed.
    ///
    /// The metadata rows go in one transaction. The file is removed after
    /// the commit and is not covered by it.
    pub async fn delete(&self, hash: &str) -> StoreResult<bool> {
        let hash = BlobHash::parse(hash).map_err(|_| StoreError::InvalidHash(hash.to_string()))?;
        if self.index.get(&hash)?.is_none() {
            return Ok(false);
        }

        self.index.remove(&hash)?;
        remove_file_if_present(&self.blob_path(&hash)).await?;

        info!(%hash, "Deleted blob");
        Ok(true)
    }

    /// Record that `hash` was just read. Never fails.
    pub fn update_access_time(&self, hash: &str) {
        let Ok(hash) = BlobHash::parse(hash) else {
            return;
        };
        if let Err(e) = self.index.touch(&hash, unix_now()) {
            warn!(%hash, error = %e, "Failed to update access time");
        }
    }

    /// Blob count and total stored bytes.
    pub fn stats(&self) -> StoreResult<IndexStats> {
        self.index.stats()
    }
}

async fn remove_file_if_present(path: &Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Blob file already missing on delete");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMetadataIndex;
    use futures_util::TryStreamExt;

    const HELLO_HASH: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn open_store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(BlobStoreConfig::under(dir.path())).unwrap();
        (dir, store)
    }

    fn body(data: &[u8]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        let chunks: Vec<io::Result<Bytes>> = data
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks)
    }

    async fn collect(stream: BlobStream) -> Vec<u8> {
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    fn staging_entries(store: &BlobStore) -> usize {
        std::fs::read_dir(store.staging_dir()).unwrap().count()
    }

    // -----------------------------------------------------------------------
    // store
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn store_then_read_roundtrip() {
        let (_dir, store) = open_store();
        let record = store
            .store(body(b"hello world"), Some("text/plain"), None, None)
            .await
            .unwrap();
        assert_eq!(record.hash.to_hex(), HELLO_HASH);
        assert_eq!(record.size, 11);
        assert_eq!(record.mime_type.as_deref(), Some("text/plain"));

        let view = store.read(HELLO_HASH, None, None).await.unwrap().unwrap();
        assert_eq!(view.mime_type, "text/plain");
        assert_eq!(view.content_length(), 11);
        let content = collect(store.open_content(&view).await.unwrap()).await;
        assert_eq!(content, b"hello world");
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn store_empty_body() {
        let (_dir, store) = open_store();
        let record = store.store(body(b""), None, None, None).await.unwrap();
        assert_eq!(record.size, 0);
        assert_eq!(
            record.hash.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn store_large_body_streams_in_chunks() {
        let (_dir, store) = open_store();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let record = store
            .store(stream::iter(vec![Ok(Bytes::from(data.clone()))]), None, None, None)
            .await
            .unwrap();
        assert_eq!(record.size, 200_000);

        let view = store.read(&record.hash.to_hex(), None, None).await.unwrap().unwrap();
        let content = collect(store.open_content(&view).await.unwrap()).await;
        assert_eq!(content, data);
    }

    #[tokio::test]
    async fn outcome_reports_creation() {
        let (_dir, store) = open_store();
        let first = store
            .store_with_outcome(body(b"hello world"), None, None, None)
            .await
            .unwrap();
        assert!(first.created);
        let second = store
            .store_with_outcome(body(b"hello world"), None, None, None)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.record, second.record);
    }

    #[tokio::test]
    async fn store_is_idempotent() {
        let (_dir, store) = open_store();
        let pubkey = "ab".repeat(32);
        let first = store
            .store(body(b"hello world"), Some("text/plain"), Some(&pubkey), None)
            .await
            .unwrap();
        let second = store
            .store(body(b"hello world"), Some("image/png"), None, None)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.stats().unwrap().blob_count, 1);
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn store_rejects_hash_mismatch_and_keeps_nothing() {
        let (_dir, store) = open_store();
        let wrong = "00".repeat(32);
        let err = store
            .store(body(b"hello world"), None, None, Some(&wrong))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        assert_eq!(err.kind(), blossom_types::ErrorKind::Conflict);

        assert!(store.find(HELLO_HASH).await.unwrap().is_none());
        assert!(!store.blob_path(&BlobHash::parse(HELLO_HASH).unwrap()).exists());
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn store_accepts_uppercase_expected_hash() {
        let (_dir, store) = open_store();
        let expected = HELLO_HASH.to_ascii_uppercase();
        let record = store
            .store(body(b"hello world"), None, None, Some(&expected))
            .await
            .unwrap();
        assert_eq!(record.hash.to_hex(), HELLO_HASH);
    }

    #[tokio::test]
    async fn store_enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlobStoreConfig {
            max_blob_size: 10,
            ..BlobStoreConfig::under(dir.path())
        };
        let store = BlobStore::open(config).unwrap();
        let err = store.store(body(b"hello world"), None, None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::TooLarge { limit: 10 }));
        assert_eq!(store.stats().unwrap().blob_count, 0);
        assert_eq!(staging_entries(&store), 0);

        store.store(body(b"0123456789"), None, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn store_stream_error_discards_staging() {
        let (_dir, store) = open_store();
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client gone")),
        ]);
        let err = store.store(failing, None, None, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(staging_entries(&store), 0);
        assert_eq!(store.stats().unwrap().blob_count, 0);
    }

    #[tokio::test]
    async fn store_restores_missing_file() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        std::fs::remove_file(store.blob_path(&record.hash)).unwrap();

        let again = store.store(body(b"hello world"), None, None, None).await.unwrap();
        assert_eq!(again, record);
        assert!(store.find(HELLO_HASH).await.unwrap().is_some());
    }

    // -----------------------------------------------------------------------
    // find / read
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn find_rejects_malformed_hash() {
        let (_dir, store) = open_store();
        assert!(store.find("not-a-hash").await.unwrap().is_none());
        assert!(store.find(&HELLO_HASH.to_ascii_uppercase()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_hides_record_without_file() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        std::fs::remove_file(store.blob_path(&record.hash)).unwrap();
        assert!(store.find(HELLO_HASH).await.unwrap().is_none());
        assert!(store.read(HELLO_HASH, None, None).await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn find_hides_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        let path = store.blob_path(&record.hash);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(&path).is_ok() {
            // Permission bits do not bind this user (root).
            return;
        }

        assert!(store.find(HELLO_HASH).await.unwrap().is_none());
        assert!(store.read(HELLO_HASH, None, None).await.unwrap().is_none());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(store.find(HELLO_HASH).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_hides_non_file_blob_path() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        let path = store.blob_path(&record.hash);
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(store.find(HELLO_HASH).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_with_range() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"0123456789"), None, None, None).await.unwrap();
        let hash = record.hash.to_hex();

        let view = store.read(&hash, Some("bytes=2-4"), None).await.unwrap().unwrap();
        assert_eq!(view.range, Some(ByteRange::new(2, 4)));
        assert_eq!(view.content_length(), 3);
        assert_eq!(view.content_range().as_deref(), Some("bytes 2-4/10"));
        let content = collect(store.open_content(&view).await.unwrap()).await;
        assert_eq!(content, b"234");
    }

    #[tokio::test]
    async fn read_with_unsatisfiable_range_serves_everything() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"0123456789"), None, None, None).await.unwrap();
        let hash = record.hash.to_hex();

        for header in ["bytes=10-", "bytes=5-2", "bytes=0-1,3-4", "items=0-1", "  "] {
            let view = store.read(&hash, Some(header), None).await.unwrap().unwrap();
            assert_eq!(view.range, None, "header {header:?}");
            assert_eq!(view.content_length(), 10);
        }
    }

    #[tokio::test]
    async fn read_uses_extension_hint() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"plain"), None, None, None).await.unwrap();
        let hash = record.hash.to_hex();

        let view = store.read(&hash, None, Some("png")).await.unwrap().unwrap();
        assert_eq!(view.mime_type, "image/png");
        let view = store.read(&hash, None, None).await.unwrap().unwrap();
        assert_eq!(view.mime_type, blossom_types::DEFAULT_MIME_TYPE);
    }

    // -----------------------------------------------------------------------
    // delete / access / stats
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_everything() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        store.update_access_time(HELLO_HASH);

        assert!(store.delete(HELLO_HASH).await.unwrap());
        assert!(!store.blob_path(&record.hash).exists());
        assert!(store.index().get(&record.hash).unwrap().is_none());
        assert!(store.index().last_accessed(&record.hash).unwrap().is_none());
        assert!(!store.delete(HELLO_HASH).await.unwrap());
    }

    #[tokio::test]
    async fn delete_validates_hash() {
        let (_dir, store) = open_store();
        let err = store.delete("xyz").await.unwrap_err();
        assert_eq!(err.kind(), blossom_types::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let (_dir, store) = open_store();
        let record = store.store(body(b"hello world"), None, None, None).await.unwrap();
        std::fs::remove_file(store.blob_path(&record.hash)).unwrap();
        assert!(store.delete(HELLO_HASH).await.unwrap());
        assert_eq!(store.stats().unwrap().blob_count, 0);
    }

    #[tokio::test]
    async fn update_access_time_is_best_effort() {
        let (_dir, store) = open_store();
        store.update_access_time("garbage");
        store.update_access_time(HELLO_HASH);
        let hash = BlobHash::parse(HELLO_HASH).unwrap();
        assert!(store.index().last_accessed(&hash).unwrap().is_some());
    }

    #[tokio::test]
    async fn works_with_in_memory_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::with_index(
            BlobStoreConfig::under(dir.path()),
            Arc::new(InMemoryMetadataIndex::new()),
        )
        .unwrap();
        store.store(body(b"abc"), None, None, None).await.unwrap();
        store.store(body(b"defg"), None, None, None).await.unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.blob_count, 2);
        assert_eq!(stats.total_size, 7);
    }
}
