use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use blossom_store::StoreError;
use blossom_types::{AuthErrorKind, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Header carrying a human-readable failure reason (BUD-01).
pub const X_REASON: &str = "x-reason";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{reason}")]
    Auth { kind: AuthErrorKind, reason: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("blob exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn auth(kind: AuthErrorKind, reason: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            reason: reason.into(),
        }
    }

    /// Project onto the shared outcome taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { kind, .. } => ErrorKind::Auth(*kind),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Store(e) => e.kind(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Auth(_) => StatusCode::UNAUTHORIZED,
            ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Reduce `text` to something that is always a valid header value.
fn reason_header(text: &str) -> HeaderValue {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    HeaderValue::from_str(&cleaned).unwrap_or_else(|_| HeaderValue::from_static("error"))
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match &self {
            // Internal detail stays in the log.
            Self::Store(StoreError::Io(_) | StoreError::Database(_))
            | Self::Io(_)
            | Self::Internal(_)
            | Self::Config(_) => {
                error!(error = %self, "Request failed");
                "internal storage error".to_string()
            }
            Self::Auth { .. } => {
                warn!(%kind, reason = %self, "Request unauthorized");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let mut response = (
            status,
            Json(json!({ "error": kind.to_string(), "message": message })),
        )
            .into_response();
        let headers = response.headers_mut();
        headers.insert(X_REASON, reason_header(&message));
        if matches!(kind, ErrorKind::Auth(_)) {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Nostr"));
        }
        response
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use blossom_types::BlobHash;

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::auth(AuthErrorKind::Expired, "old").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::TooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let mismatch = StoreError::HashMismatch {
            expected: "a".into(),
            computed: BlobHash::from_digest([0; 32]),
        };
        assert_eq!(ServerError::from(mismatch).status(), StatusCode::CONFLICT);
        assert_eq!(
            ServerError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_response_has_challenge_and_reason() {
        let response = ServerError::auth(AuthErrorKind::Expired, "event expired").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Nostr");
        assert_eq!(response.headers()[X_REASON], "event expired");
    }

    #[test]
    fn storage_errors_hide_detail() {
        let response = ServerError::Internal("disk exploded at /secret/path".into()).into_response();
        assert_eq!(response.headers()[X_REASON], "internal storage error");
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn reason_header_sanitizes_control_chars() {
        assert_eq!(reason_header("bad\nline\u{e9}"), "bad?line?");
    }
}
