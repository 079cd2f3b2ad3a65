use std::net::SocketAddr;
use std::path::Path;

use blossom_gate::GateConfig;
use blossom_store::BlobStoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Base URL used in upload descriptors. Derived from the request's
    /// `Host` header when unset.
    pub public_url: Option<String>,
    pub require_auth_for_upload: bool,
    pub require_auth_for_get: bool,
    pub require_auth_for_delete: bool,
    pub store: BlobStoreConfig,
    pub gate: GateConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            public_url: None,
            require_auth_for_upload: true,
            require_auth_for_get: false,
            require_auth_for_delete: true,
            store: BlobStoreConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
