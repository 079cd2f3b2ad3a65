//! SQLite-backed metadata index.
//!
//! ## Tables
//!
//! - `blobs` - one row per stored blob (hash, size, type, uploaded, pubkey)
//! - `accessed` - last access timestamp per blob, upserted on every read
//!
//! A fresh connection is opened for each operation and dropped when it
//! returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use blossom_types::{AccessRecord, BlobHash, BlobRecord, UnixSeconds};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::traits::{IndexStats, MetadataIndex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    hash     TEXT(64) PRIMARY KEY,
    size     INTEGER NOT NULL,
    type     TEXT,
    uploaded INTEGER NOT NULL,
    pubkey   TEXT(64)
);
CREATE INDEX IF NOT EXISTS blobs_pubkey ON blobs (pubkey);
CREATE INDEX IF NOT EXISTS blobs_uploaded ON blobs (uploaded);

CREATE TABLE IF NOT EXISTS accessed (
    blob      TEXT(64) PRIMARY KEY,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS accessed_timestamp ON accessed (timestamp);
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata index stored in a single SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteMetadataIndex {
    path: PathBuf,
}

impl SqliteMetadataIndex {
    /// Open or create the database at `path` and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let index = Self { path };
        let conn = index.connect()?;
        // WAL lets readers proceed while an upload commits.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %index.path.display(), "Opened metadata index");
        Ok(index)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn blob_from_row(row: &Row<'_>) -> rusqlite::Result<BlobRecord> {
    let hash_text: String = row.get(0)?;
    let hash = BlobHash::parse(&hash_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(BlobRecord {
        hash,
        size: row.get::<_, i64>(1)? as u64,
        mime_type: row.get(2)?,
        uploaded_at: row.get::<_, i64>(3)? as UnixSeconds,
        uploader_pubkey: row.get(4)?,
    })
}

fn query_blob(conn: &Connection, hash: &BlobHash) -> rusqlite::Result<Option<BlobRecord>> {
    conn.query_row(
        "SELECT hash, size, type, uploaded, pubkey FROM blobs WHERE hash = ?1",
        params![hash.to_hex()],
        blob_from_row,
    )
    .optional()
}

impl MetadataIndex for SqliteMetadataIndex {
    fn get(&self, hash: &BlobHash) -> StoreResult<Option<BlobRecord>> {
        let conn = self.connect()?;
        Ok(query_blob(&conn, hash)?)
    }

    fn insert(&self, record: &BlobRecord) -> StoreResult<BlobRecord> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO blobs (hash, size, type, uploaded, pubkey) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.hash.to_hex(),
                record.size as i64,
                record.mime_type,
                record.uploaded_at as i64,
                record.uploader_pubkey,
            ],
        )?;
        let stored = query_blob(&tx, &record.hash)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;

        if inserted == 0 {
            debug!(hash = %record.hash, "Blob row already present, kept original");
        }
        Ok(stored)
    }

    fn remove(&self, hash: &BlobHash) -> StoreResult<bool> {
        let mut conn = self.connect()?;
        // Dropping the transaction without commit rolls both deletes back.
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM blobs WHERE hash = ?1", params![hash.to_hex()])?;
        tx.execute("DELETE FROM accessed WHERE blob = ?1", params![hash.to_hex()])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn touch(&self, hash: &BlobHash, at: UnixSeconds) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO accessed (blob, timestamp) VALUES (?1, ?2) \
             ON CONFLICT(blob) DO UPDATE SET timestamp = excluded.timestamp",
            params![hash.to_hex(), at as i64],
        )?;
        Ok(())
    }

    fn last_accessed(&self, hash: &BlobHash) -> StoreResult<Option<AccessRecord>> {
        let conn = self.connect()?;
        let timestamp: Option<i64> = conn
            .query_row(
                "SELECT timestamp FROM accessed WHERE blob = ?1",
                params![hash.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(timestamp.map(|ts| AccessRecord {
            hash: *hash,
            last_accessed_at: ts as UnixSeconds,
        }))
    }

    fn stats(&self) -> StoreResult<IndexStats> {
        let conn = self.connect()?;
        let (count, total): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM blobs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(IndexStats {
            blob_count: count as u64,
            total_size: total as u64,
        })
    }
}
