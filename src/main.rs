//! broker-gate server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                   BROKER GATE                    │
//!                     │                                                  │
//!   Client            │  ┌──────────┐   ┌───────────┐   ┌─────────────┐  │
//!   ──────────────────┼─▶│   net    │──▶│  server   │──▶│  session    │  │
//!   CONNECT {...}     │  │ listener │   │  client   │   │  machine    │  │
//!                     │  └──────────┘   └─────┬─────┘   └──────┬──────┘  │
//!                     │                       │                │         │
//!   INFO / +OK / -ERR │  ┌──────────┐         │         ┌──────▼──────┐  │
//!   ◀─────────────────┼──│  writer  │◀────────┘         │    auth     │  │
//!                     │  │ (outbox) │   auth timer ───▶ │   policy    │  │
//!                     │  └──────────┘                   └─────────────┘  │
//!                     │                                                  │
//!                     │  config · observability · lifecycle              │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use broker_gate::auth::AdmissionPolicy;
use broker_gate::config::{self, ConfigError, GateConfig};
use broker_gate::lifecycle::{self, Shutdown};
use broker_gate::net::Listener;
use broker_gate::observability::{logging, metrics};
use broker_gate::server::{GateServer, NullRouter};

#[derive(Debug, Parser)]
#[command(name = "broker-gate")]
#[command(about = "Connection admission gate for a publish/subscribe broker", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:4222.
    #[arg(long)]
    addr: Option<String>,

    /// Shared token (plaintext or bcrypt hash).
    #[arg(long = "auth")]
    token: Option<String>,

    #[arg(long)]
    user: Option<String>,

    /// Password (plaintext or bcrypt hash).
    #[arg(long)]
    pass: Option<String>,

    /// Grace period for the CONNECT handshake.
    #[arg(long)]
    auth_timeout_ms: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut GateConfig) {
        if let Some(addr) = self.addr {
            config.listener.bind_address = addr;
        }
        if let Some(token) = self.token {
            config.auth.token = token;
        }
        if let Some(user) = self.user {
            config.auth.username = user;
        }
        if let Some(pass) = self.pass {
            config.auth.password = pass;
        }
        if let Some(ms) = self.auth_timeout_ms {
            config.timeouts.auth_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    let mut config = match args.config.take() {
        Some(path) => config::read_config(&path)?,
        None => GateConfig::default(),
    };
    args.apply(&mut config);
    config::validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "broker-gate starting");

    let policy = AdmissionPolicy::from_config(&config.auth)?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        mode = policy.mode().as_str(),
        auth_timeout_ms = config.timeouts.auth_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    let shutdown = Shutdown::new();

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        lifecycle::wait_for_signal().await;
        on_signal.trigger();
    });

    let server = GateServer::new(&config, policy, Arc::new(NullRouter));
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
