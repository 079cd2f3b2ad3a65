use serde::{Deserialize, Serialize};

use crate::hash::BlobHash;
use crate::temporal::UnixSeconds;

/// MIME type reported when nothing more specific is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Persisted metadata for one stored blob.
///
/// Created once, on the first successful store of a given hash, and never
/// mutated afterwards. `hash` is always computed server-side from the stored
/// bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub hash: BlobHash,
    pub size: u64,
    pub mime_type: Option<String>,
    pub uploaded_at: UnixSeconds,
    /// Hex x-only public key of the authenticated uploader, if any.
    pub uploader_pubkey: Option<String>,
}

impl BlobRecord {
    /// The stored MIME type, unless it is absent, blank, or the generic
    /// octet-stream default.
    pub fn specific_mime_type(&self) -> Option<&str> {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != DEFAULT_MIME_TYPE)
    }
}

/// Last-access timestamp for a blob. One row per hash, upserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub hash: BlobHash,
    pub last_accessed_at: UnixSeconds,
}

/// The JSON document returned to clients after an upload (BUD-02).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobDescriptor {
    pub url: String,
    pub sha256: BlobHash,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded: UnixSeconds,
}

impl BlobDescriptor {
    /// Build a descriptor for `record`, served under `base_url`.
    ///
    /// `extension` (without the dot) is appended to the URL when given.
    pub fn from_record(record: &BlobRecord, base_url: &str, extension: Option<&str>) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = match extension {
            Some(ext) if !ext.is_empty() => format!("{base}/{}.{ext}", record.hash),
            _ => format!("{base}/{}", record.hash),
        };
        Self {
            url,
            sha256: record.hash,
            size: record.size,
            mime_type: record
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            uploaded: record.uploaded_at,
        }
    }
}
