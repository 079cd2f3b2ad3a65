use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName};
use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::X_REASON;
use crate::handler;
use crate::state::AppState;
use crate::upload;

/// Build the axum router with all Blossom endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/upload", put(upload::upload_blob))
        .route(
            "/:path",
            get(handler::get_blob)
                .head(handler::head_blob)
                .delete(handler::delete_blob),
        )
        // Upload size is enforced by the blob store while streaming.
        .layer(DefaultBodyLimit::disable())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(X_REASON),
            header::CONTENT_RANGE,
            header::WWW_AUTHENTICATE,
        ])
        .max_age(Duration::from_secs(3600))
}
