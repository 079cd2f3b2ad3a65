use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a credential was rejected.
///
/// Every variant is terminal for the request it arrived with: retrying
/// needs a freshly signed credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorKind {
    MissingAuth,
    InvalidFormat,
    MalformedEncoding,
    InvalidKind,
    TimestampFuture,
    Expired,
    MissingTags,
    InvalidAction,
    InvalidSignature,
    HashMismatch,
}

impl AuthErrorKind {
    /// Default human-readable message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingAuth => "authorization required for this operation",
            Self::InvalidFormat => "invalid auth event format",
            Self::MalformedEncoding => "malformed base64 encoding",
            Self::InvalidKind => "invalid event kind",
            Self::TimestampFuture => "event timestamp is in the future",
            Self::Expired => "auth event expired",
            Self::MissingTags => "required tags missing",
            Self::InvalidAction => "invalid action in t tag",
            Self::InvalidSignature => "invalid event signature",
            Self::HashMismatch => "sha256 hash mismatch in auth event",
        }
    }

    /// Stable identifier, e.g. `INVALID_KIND`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "MISSING_AUTH",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::MalformedEncoding => "MALFORMED_ENCODING",
            Self::InvalidKind => "INVALID_KIND",
            Self::TimestampFuture => "TIMESTAMP_FUTURE",
            Self::Expired => "EXPIRED",
            Self::MissingTags => "MISSING_TAGS",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::HashMismatch => "HASH_MISMATCH",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome taxonomy shared by every core operation.
///
/// Transport layers map these onto status codes; the core never does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed hash, range, or request input.
    Validation,
    /// No record, or a record whose file is missing or unreadable.
    NotFound,
    /// Declared or credential hash disagrees with the computed one.
    Conflict,
    Auth(AuthErrorKind),
    /// I/O or database failure. Not retried by the core.
    Storage,
    /// Upload exceeds the configured size ceiling.
    TooLarge,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => f.write_str("ValidationError"),
            Self::NotFound => f.write_str("NotFound"),
            Self::Conflict => f.write_str("Conflict"),
            Self::Auth(kind) => write!(f, "AuthError({kind})"),
            Self::Storage => f.write_str("StorageError"),
            Self::TooLarge => f.write_str("TooLarge"),
        }
    }
}

impl From<AuthErrorKind> for ErrorKind {
    fn from(kind: AuthErrorKind) -> Self {
        Self::Auth(kind)
    }
}
