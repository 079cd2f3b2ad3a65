use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Json, Response};
use blossom_gate::AuthRequest;
use blossom_store::BlobContentView;
use blossom_types::BlobHash;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{authorize, AuthPolicy};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Blobs never change once stored.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler: server identity and storage statistics.
pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let stats = state.store.stats()?;
    Ok(Json(json!({
        "name": "blossom-server",
        "version": env!("CARGO_PKG_VERSION"),
        "blob_count": stats.blob_count,
        "total_size": stats.total_size,
        "max_blob_size": state.store.config().max_blob_size,
    })))
}

/// `GET /<sha256>[.ext]`
pub async fn get_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let view = resolve_blob(&state, &path, &headers).await?;
    let body = Body::from_stream(state.store.open_content(&view).await?);
    blob_response(&view, body)
}

/// `HEAD /<sha256>[.ext]`: same headers as GET, no body.
pub async fn head_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let view = resolve_blob(&state, &path, &headers).await?;
    blob_response(&view, Body::empty())
}

/// `DELETE /<sha256>`
pub async fn delete_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<serde_json::Value>> {
    let (hash, _) = parse_blob_path(&path)?;
    let hex = hash.to_hex();

    let policy = AuthPolicy::required_or(state.config.require_auth_for_delete, AuthPolicy::IfPresent);
    authorize(
        &state.gate,
        &headers,
        AuthRequest::new("delete").with_hash(&hex),
        policy,
    )?;

    if !state.store.delete(&hex).await? {
        return Err(ServerError::NotFound(format!("blob {hex} not found")));
    }
    info!(%hash, "Blob deleted via API");
    Ok(Json(json!({ "deleted": hex })))
}

/// Extract the hash and advisory extension from a request path segment.
fn parse_blob_path(path: &str) -> ServerResult<(BlobHash, Option<String>)> {
    BlobHash::from_path_segment(path)
        .ok_or_else(|| ServerError::NotFound(format!("no blob hash in path '{path}'")))
}

/// Shared lookup for GET and HEAD.
async fn resolve_blob(state: &AppState, path: &str, headers: &HeaderMap) -> ServerResult<BlobContentView> {
    let (hash, extension) = parse_blob_path(path)?;
    let hex = hash.to_hex();

    let policy = AuthPolicy::required_or(state.config.require_auth_for_get, AuthPolicy::Optional);
    authorize(&state.gate, headers, AuthRequest::new("get"), policy)?;

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let view = state
        .store
        .read(&hex, range, extension.as_deref())
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("blob {hex} not found")))?;

    state.store.update_access_time(&hex);
    debug!(%hash, range = ?view.range, mime = %view.mime_type, "Serving blob");
    Ok(view)
}

fn blob_response(view: &BlobContentView, body: Body) -> ServerResult<Response> {
    let status = if view.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, view.mime_type.as_str())
        .header(header::CONTENT_LENGTH, view.content_length())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL);
    if let Some(content_range) = view.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(body)
        .map_err(|e| ServerError::Internal(e.to_string()))
}
