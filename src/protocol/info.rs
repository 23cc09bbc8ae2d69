//! INFO banner.

use serde::{Deserialize, Serialize};

/// Capabilities announced to every peer before the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub auth_required: bool,
    pub max_payload: usize,
}

impl ServerInfo {
    /// Build a banner with a freshly generated server id.
    pub fn new(host: String, port: u16, auth_required: bool, max_payload: usize) -> Self {
        Self {
            server_id: uuid::Uuid::new_v4().simple().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            host,
            port,
            auth_required,
            max_payload,
        }
    }
}
