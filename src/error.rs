//! Top-level error type for starting and running the gate.

use thiserror::Error;

use crate::auth::PolicyError;
use crate::config::ConfigError;
use crate::net::ListenerError;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("auth configuration error: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
