use std::sync::Arc;

use blossom_gate::AuthGate;
use blossom_store::BlobStore;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BlobStore>,
    pub gate: Arc<AuthGate>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the blob store and build the default gate from `config`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = BlobStore::open(config.store.clone())?;
        Ok(Self::with_store(config, store))
    }

    /// Assemble state around an already-open store.
    pub fn with_store(config: ServerConfig, store: BlobStore) -> Self {
        let gate = AuthGate::with_default_stages(config.gate.clone());
        Self {
            store: Arc::new(store),
            gate: Arc::new(gate),
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_addr", &self.config.bind_addr)
            .field("storage_root", &self.store.config().storage_root)
            .finish_non_exhaustive()
    }
}
