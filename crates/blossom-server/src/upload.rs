//! `PUT /upload`: stream a blob in, bind it to the uploader's credential,
//! and answer with a descriptor.

use std::io;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use blossom_gate::{AuthDecision, AuthRequest};
use blossom_store::{mime, BlobStore};
use blossom_types::{AuthErrorKind, BlobDescriptor, BlobHash};
use futures_util::TryStreamExt;
use tracing::{debug, error, info};

use crate::auth::{authorize, AuthPolicy};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header a client may use to declare the SHA-256 of the body up front.
pub const X_SHA_256: &str = "x-sha-256";

pub async fn upload_blob(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> ServerResult<(StatusCode, Json<BlobDescriptor>)> {
    let config = &state.config;
    let policy = AuthPolicy::required_or(config.require_auth_for_upload, AuthPolicy::IfPresent);
    let decision = authorize(&state.gate, &headers, AuthRequest::new("upload"), policy)?;

    let limit = state.store.config().max_blob_size;
    match content_length(&headers) {
        Some(0) => return Err(ServerError::Validation("upload body is empty".into())),
        Some(len) if len > limit => return Err(ServerError::TooLarge { limit }),
        _ => {}
    }

    let declared_mime = header_str(&headers, header::CONTENT_TYPE.as_str());
    let expected = header_str(&headers, X_SHA_256);
    let uploader = decision.as_ref().and_then(|d| d.pubkey.as_deref());
    debug!(mime = ?declared_mime, expected = ?expected, uploader = ?uploader, "Upload started");

    let stream = Box::pin(body.into_data_stream().map_err(io::Error::other));
    let outcome = state
        .store
        .store_with_outcome(stream, declared_mime, uploader, expected)
        .await?;
    let record = outcome.record;

    if record.size == 0 {
        if outcome.created {
            rollback(&state.store, &record.hash).await;
        }
        return Err(ServerError::Validation("upload body is empty".into()));
    }

    // The stored hash is removed even when it predates this request.
    if let Err(e) = check_hash_binding(decision.as_ref(), &record.hash) {
        rollback(&state.store, &record.hash).await;
        return Err(e);
    }

    let base_url = base_url(config.public_url.as_deref(), &headers, config.bind_addr);
    let extension = record.mime_type.as_deref().and_then(mime::extension_for);
    let descriptor = BlobDescriptor::from_record(&record, &base_url, extension);

    info!(hash = %record.hash, size = record.size, created = outcome.created, "Upload completed");
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// An `x` tag on the credential must name the hash that was actually stored.
fn check_hash_binding(decision: Option<&AuthDecision>, hash: &BlobHash) -> ServerResult<()> {
    let Some(tagged) = decision.and_then(|d| d.tag("x")) else {
        return Ok(());
    };
    if tagged.eq_ignore_ascii_case(&hash.to_hex()) {
        return Ok(());
    }
    Err(ServerError::auth(
        AuthErrorKind::HashMismatch,
        format!("auth event x tag {tagged} does not match uploaded blob {hash}"),
    ))
}

/// Remove a blob after a failed upload. Failures are logged only.
async fn rollback(store: &BlobStore, hash: &BlobHash) {
    match store.delete(&hash.to_hex()).await {
        Ok(_) => debug!(%hash, "Rolled back upload"),
        Err(e) => error!(%hash, error = %e, "Failed to roll back upload"),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, header::CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok())
}

/// `public_url` if configured, else `scheme://host` from the request.
pub(crate) fn base_url(
    public_url: Option<&str>,
    headers: &HeaderMap,
    bind_addr: std::net::SocketAddr,
) -> String {
    if let Some(url) = public_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }
    let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| bind_addr.to_string());
    format!("{scheme}://{host}")
}
