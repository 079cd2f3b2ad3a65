//! HTTP server for the Blossom blob server.
//!
//! Serves content-addressed blobs over HTTP (BUD-01 retrieval with range
//! support, BUD-02 style upload and delete) with Nostr event authorization.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;
pub mod upload;

pub use auth::{authorize, AuthPolicy};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult, X_REASON};
pub use router::build_router;
pub use server::BlobServer;
pub use state::AppState;
