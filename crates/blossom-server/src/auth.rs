use axum::http::{header, HeaderMap};
use blossom_gate::{AuthDecision, AuthGate, AuthRequest};
use blossom_types::AuthErrorKind;
use tracing::debug;

use crate::error::{ServerError, ServerResult};

/// How strictly an endpoint treats the `Authorization` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPolicy {
    /// A valid credential is mandatory.
    Required,
    /// No credential is fine, but one that is sent must be valid.
    IfPresent,
    /// Credentials are checked and logged but never block the request.
    Optional,
}

impl AuthPolicy {
    /// `Required` when `required`, otherwise `fallback`.
    pub fn required_or(required: bool, fallback: AuthPolicy) -> Self {
        if required {
            Self::Required
        } else {
            fallback
        }
    }
}

/// The raw `Authorization` header, if it is present and readable.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Apply `policy` to the request's credential.
///
/// Returns the decision when a credential was evaluated, `None` when none
/// was sent and none was needed.
pub fn authorize(
    gate: &AuthGate,
    headers: &HeaderMap,
    request: AuthRequest<'_>,
    policy: AuthPolicy,
) -> ServerResult<Option<AuthDecision>> {
    let header = authorization_header(headers);
    if header.is_none() && policy != AuthPolicy::Required {
        return Ok(None);
    }

    let decision = gate.validate(header, request);
    if decision.is_valid() {
        debug!(action = request.action, pubkey = ?decision.pubkey, "Request authorized");
        return Ok(Some(decision));
    }

    if policy == AuthPolicy::Optional {
        debug!(action = request.action, reason = ?decision.reason, "Ignoring invalid optional credential");
        return Ok(Some(decision));
    }

    let kind = decision.failure().unwrap_or(AuthErrorKind::MissingAuth);
    let reason = decision
        .reason
        .clone()
        .unwrap_or_else(|| kind.message().to_string());
    Err(ServerError::auth(kind, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use blossom_gate::GateConfig;

    fn gate() -> AuthGate {
        AuthGate::with_default_stages(GateConfig::default())
    }

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn absent_header_depends_on_policy() {
        let empty = HeaderMap::new();
        let request = AuthRequest::new("get");
        assert!(authorize(&gate(), &empty, request, AuthPolicy::Optional).unwrap().is_none());
        assert!(authorize(&gate(), &empty, request, AuthPolicy::IfPresent).unwrap().is_none());

        let err = authorize(&gate(), &empty, request, AuthPolicy::Required).unwrap_err();
        assert!(matches!(
            err,
            ServerError::Auth {
                kind: AuthErrorKind::MissingAuth,
                ..
            }
        ));
    }

    #[test]
    fn invalid_header_blocks_unless_optional() {
        let headers = headers_with("Bearer token");
        let request = AuthRequest::new("upload");

        let decision = authorize(&gate(), &headers, request, AuthPolicy::Optional)
            .unwrap()
            .unwrap();
        assert!(!decision.is_valid());

        let err = authorize(&gate(), &headers, request, AuthPolicy::IfPresent).unwrap_err();
        assert!(matches!(
            err,
            ServerError::Auth {
                kind: AuthErrorKind::InvalidFormat,
                ..
            }
        ));
    }

    #[test]
    fn required_or_picks_policy() {
        assert_eq!(AuthPolicy::required_or(true, AuthPolicy::Optional), AuthPolicy::Required);
        assert_eq!(AuthPolicy::required_or(false, AuthPolicy::Optional), AuthPolicy::Optional);
    }
}
