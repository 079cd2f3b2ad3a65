//! Content-addressed blob storage for the Blossom blob server.
//!
//! Blobs are stored as flat files named by their SHA-256 hex digest. A
//! metadata index records size, declared type, upload time and uploader for
//! each blob, plus a last-access timestamp.
//!
//! # Storage Backends
//!
//! All metadata backends implement the [`MetadataIndex`] trait:
//!
//! - [`SqliteMetadataIndex`] -- SQLite file, used by the server
//! - [`InMemoryMetadataIndex`] -- `HashMap`-based index for tests and embedding
//!
//! # Design Rules
//!
//! 1. The hash is always computed from the bytes written, never trusted.
//! 2. Stage, hash, then rename. No partial file is ever visible under its final name.
//! 3. Blob rows are immutable. Re-uploading identical bytes returns the first record.
//! 4. Metadata without a readable file is reported as absent.
//! 5. Access-time tracking is best-effort and never fails a read.

pub mod blob_store;
pub mod config;
pub mod error;
pub mod memory;
pub mod mime;
pub mod sqlite;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob_store::{BlobContentView, BlobStore, BlobStream, StoreOutcome};
pub use config::{BlobStoreConfig, DEFAULT_MAX_BLOB_SIZE};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMetadataIndex;
pub use sqlite::SqliteMetadataIndex;
pub use traits::{IndexStats, MetadataIndex};
