use blossom_types::BlobHash;
use sha2::{Digest, Sha256};

/// Incremental SHA-256 hasher producing a [`BlobHash`].
///
/// Feed it chunks as they stream past, then call [`Self::finalize`]. Also
/// counts the bytes it has seen so writers do not have to track size
/// separately.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes_seen: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes_seen += chunk.len() as u64;
    }

    /// Total bytes absorbed so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> BlobHash {
        BlobHash::from_digest(self.inner.finalize().into())
    }

    /// One-shot hash of an in-memory buffer.
    pub fn hash(data: &[u8]) -> BlobHash {
        BlobHash::from_digest(Sha256::digest(data).into())
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("bytes_seen", &self.bytes_seen)
            .finish()
    }
}
