use blossom_crypto::SignatureError;
use blossom_types::AuthErrorKind;

/// Reasons an authorization event could not be decoded or checked.
///
/// The gate itself never returns these to callers. Each one is folded into
/// a rejected [`AuthDecision`](crate::AuthDecision) via [`Self::kind`].
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No `Authorization` header, or only whitespace.
    #[error("missing Authorization header")]
    MissingHeader,

    /// Header does not use the `Nostr` scheme or has no payload.
    #[error("invalid Authorization scheme: {0}")]
    InvalidScheme(String),

    /// Payload is not valid standard base64.
    #[error("malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload is not the JSON event shape.
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Event kind is missing or wrong.
    #[error("invalid kind, expected {expected}")]
    InvalidKind { expected: u64 },

    /// A field is present but malformed.
    #[error("invalid field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// Key parsing, signing or verification failed.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },
}

impl GateError {
    /// Create an invalid-field error.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    /// Create a stage error with a name and message.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// The authorization failure this error is reported as.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::MissingHeader => AuthErrorKind::MissingAuth,
            Self::InvalidScheme(_) | Self::Json(_) | Self::InvalidField { .. } => {
                AuthErrorKind::InvalidFormat
            }
            Self::Base64(_) => AuthErrorKind::MalformedEncoding,
            Self::InvalidKind { .. } => AuthErrorKind::InvalidKind,
            Self::Signature(_) => AuthErrorKind::InvalidSignature,
            Self::StageError { .. } => AuthErrorKind::InvalidFormat,
        }
    }
}

/// Result alias for gate internals.
pub type GateResult<T> = Result<T, GateError>;
