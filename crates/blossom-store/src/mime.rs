//! MIME type resolution for stored blobs.
//!
//! Precedence, first match wins:
//!
//! 1. the non-default type stored on the record
//! 2. a guess from the extension on the request path
//! 3. a sniff of the leading bytes of the file
//! 4. `application/octet-stream`

use std::io::Read;
use std::path::Path;

use blossom_types::{BlobRecord, DEFAULT_MIME_TYPE};
use tracing::debug;

/// Bytes read from the head of a file when sniffing.
const SNIFF_LEN: u64 = 8192;

/// Resolve the type to serve `record` as.
pub fn resolve(record: &BlobRecord, extension: Option<&str>, path: &Path) -> String {
    if let Some(stored) = record.specific_mime_type() {
        return stored.to_string();
    }
    if let Some(guessed) = extension.and_then(from_extension) {
        debug!(hash = %record.hash, mime = guessed, "MIME type from extension");
        return guessed.to_string();
    }
    if let Some(sniffed) = sniff_file(path) {
        debug!(hash = %record.hash, mime = sniffed, "MIME type from content");
        return sniffed.to_string();
    }
    DEFAULT_MIME_TYPE.to_string()
}

/// Guess a type from a bare extension such as `png` or `PDF`.
pub fn from_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.trim().to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }
    mime_guess::from_ext(&ext)
        .first_raw()
        .filter(|m| *m != DEFAULT_MIME_TYPE)
}

/// Detect a type from the magic bytes at the start of the file.
pub fn sniff_file(path: &Path) -> Option<&'static str> {
    let file = std::fs::File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).ok()?;
    infer::get(&head)
        .map(|kind| kind.mime_type())
        .filter(|m| *m != DEFAULT_MIME_TYPE)
}

/// Preferred file extension for a MIME type, used when building blob URLs.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type.split(';').next()?.trim();
    if essence.is_empty() || essence == DEFAULT_MIME_TYPE {
        return None;
    }
    mime_guess::get_mime_extensions_str(essence)?.first().copied()
}
