use blossom_types::{BlobHash, ErrorKind};

/// Errors from blob store and metadata index operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller supplied something that is not a 64-char lowercase hex hash.
    #[error("invalid blob hash: {0}")]
    InvalidHash(String),

    /// The computed digest differs from the one the caller declared.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: BlobHash },

    /// The upload exceeded the configured size ceiling.
    #[error("blob exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    /// I/O error from the filesystem or the upload stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the metadata index.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Project onto the shared outcome taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHash(_) => ErrorKind::Validation,
            Self::HashMismatch { .. } => ErrorKind::Conflict,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Io(_) | Self::Database(_) => ErrorKind::Storage,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
