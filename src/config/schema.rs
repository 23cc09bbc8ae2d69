//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every section has defaults so a minimal file (or none) is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Admission credentials.
    pub auth: AuthConfig,

    /// Handshake and write deadlines.
    pub timeouts: TimeoutConfig,

    /// Protocol size limits and queue depth.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4222").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4222".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Admission credentials.
///
/// Which fields are non-empty selects the mode: none → open, `token` →
/// token auth, `username` + `password` → user/password auth. Secrets may
/// be plaintext or bcrypt hashes.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &(!self.token.is_empty()).then_some("[REDACTED]"))
            .field("username", &self.username)
            .field("password", &(!self.password.is_empty()).then_some("[REDACTED]"))
            .finish()
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Grace period for completing the CONNECT handshake, in milliseconds.
    pub auth_ms: u64,

    /// Upper bound on a single socket write, in milliseconds.
    pub write_deadline_ms: u64,

    /// How long shutdown waits for connections to drain, in milliseconds.
    pub drain_ms: u64,
}

impl TimeoutConfig {
    pub fn auth(&self) -> Duration {
        Duration::from_millis(self.auth_ms)
    }

    pub fn write_deadline(&self) -> Duration {
        Duration::from_millis(self.write_deadline_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            auth_ms: 2_000,
            write_deadline_ms: 2_000,
            drain_ms: 5_000,
        }
    }
}

/// Protocol limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted PUB payload in bytes.
    pub max_payload: usize,

    /// Longest accepted control line in bytes, CRLF excluded.
    pub max_control_line: usize,

    /// Replies buffered per connection before it is treated as a slow consumer.
    pub outbound_queue: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload: 1024 * 1024, // 1MB
            max_control_line: 4096,
            outbound_queue: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
