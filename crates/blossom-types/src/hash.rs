use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Content-addressed identity of a blob.
///
/// A `BlobHash` is the SHA-256 digest of a blob's bytes. Its canonical text
/// form is 64 lowercase hex characters; uppercase input is rejected so that
/// one blob never has two spellings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobHash([u8; 32]);

impl BlobHash {
    /// Wrap a digest computed elsewhere.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters), for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the canonical 64-char lowercase hex form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != HASH_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: HASH_HEX_LEN,
                actual: s.len(),
            });
        }
        if !is_lower_hex(s) {
            return Err(TypeError::InvalidHex(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns `true` if `s` is a well-formed blob hash.
    pub fn is_valid(s: &str) -> bool {
        s.len() == HASH_HEX_LEN && is_lower_hex(s)
    }

    /// Find the first run of exactly 64 lowercase hex chars in a request
    /// path segment such as `"<hash>.png"`, returning the hash and an
    /// optional extension. Longer hex runs are not hashes.
    ///
    /// The extension is only reported when the segment starts with the hash.
    pub fn from_path_segment(segment: &str) -> Option<(Self, Option<String>)> {
        let bytes = segment.as_bytes();
        let mut run_start = None;
        let mut i = 0;
        while i < bytes.len() {
            if !is_lower_hex_byte(bytes[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && is_lower_hex_byte(bytes[i]) {
                i += 1;
            }
            if i - start == HASH_HEX_LEN {
                run_start = Some(start);
                break;
            }
        }
        let run_start = run_start?;

        let hash = Self::parse(&segment[run_start..run_start + HASH_HEX_LEN]).ok()?;
        let extension = if run_start == 0 {
            segment
                .rfind('.')
                .filter(|dot| *dot >= HASH_HEX_LEN && *dot + 1 < segment.len())
                .map(|dot| segment[dot + 1..].to_string())
        } else {
            None
        };
        Some((hash, extension))
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(is_lower_hex_byte)
}

fn is_lower_hex_byte(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'a'..=b'f')
}

impl fmt::Debug for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHash({})", self.short_hex())
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for BlobHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 32]> for BlobHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for BlobHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlobHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
