//! Client-facing server.
//!
//! # Data Flow
//! ```text
//! Listener::accept
//!     → ConnectionTracker::track
//!     → client.rs (one task per connection)
//!         reader: FrameReader → Session → actions
//!         writer: Outbox queue → writer.rs → socket
//!     → router.rs (frames from admitted clients)
//! ```
//!
//! # Design Decisions
//! - One INFO template per server, shared by every connection
//! - Outbound writes never block the read loop or the auth timer
//! - Shutdown stops accepting first, then drains live connections

pub mod client;
pub mod outbox;
pub mod router;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AdmissionPolicy;
use crate::config::{GateConfig, TimeoutConfig};
use crate::error::GateError;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::protocol::{FrameLimits, ServerInfo};

use client::ClientContext;

pub use outbox::Outbox;
pub use router::{MessageRouter, NullRouter};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts clients and runs each through admission.
pub struct GateServer {
    policy: Arc<AdmissionPolicy>,
    router: Arc<dyn MessageRouter>,
    limits: FrameLimits,
    timeouts: TimeoutConfig,
    outbound_queue: usize,
    tracker: ConnectionTracker,
}

impl GateServer {
    pub fn new(config: &GateConfig, policy: AdmissionPolicy, router: Arc<dyn MessageRouter>) -> Self {
        Self {
            policy: Arc::new(policy),
            router,
            limits: FrameLimits {
                max_control_line: config.limits.max_control_line,
                max_payload: config.limits.max_payload,
            },
            timeouts: config.timeouts.clone(),
            outbound_queue: config.limits.outbound_queue,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Handle on the live-connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, shutdown: Shutdown) -> Result<(), GateError> {
        let local_addr = listener.local_addr()?;
        let info = Arc::new(ServerInfo::new(
            local_addr.ip().to_string(),
            local_addr.port(),
            self.policy.auth_required(),
            self.limits.max_payload,
        ));
        let ctx = Arc::new(ClientContext {
            policy: Arc::clone(&self.policy),
            info,
            router: Arc::clone(&self.router),
            limits: self.limits,
            outbound_queue: self.outbound_queue,
            auth_timeout: self.timeouts.auth(),
            write_deadline: self.timeouts.write_deadline(),
        });

        tracing::info!(
            address = %local_addr,
            mode = self.policy.mode().as_str(),
            auth_required = self.policy.auth_required(),
            auth_timeout_ms = self.timeouts.auth_ms,
            "Gate accepting connections"
        );

        let mut stop = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = stop.recv() => {
                    tracing::info!("Stopped accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.track();
                        metrics::record_connection_accepted();
                        let ctx = Arc::clone(&ctx);
                        let client_shutdown = shutdown.subscribe();
                        tokio::spawn(async move {
                            let _permit = permit;
                            client::serve_client(stream, peer, guard, ctx, client_shutdown).await;
                        });
                    }
                    Err(ListenerError::Closed) => return Err(ListenerError::Closed.into()),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        let active = self.tracker.active_count();
        tracing::info!(active_connections = active, "Draining connections");
        if !self.tracker.drain(self.timeouts.drain()).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain deadline exceeded, abandoning connections"
            );
        }
        Ok(())
    }
}
