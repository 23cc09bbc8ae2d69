//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_connections_accepted_total` (counter): sockets accepted
//! - `gate_connections_active` (gauge): live connection tasks
//! - `gate_admissions_total` (counter): handshake outcomes by `outcome`
//!
//! Without an installed recorder every call is a no-op, so tests and
//! embedders that skip [`init_metrics`] pay nothing.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Terminal outcome of a handshake window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    Rejected,
    Timeout,
}

impl AdmissionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionOutcome::Accepted => "accepted",
            AdmissionOutcome::Rejected => "rejected",
            AdmissionOutcome::Timeout => "timeout",
        }
    }
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted() {
    metrics::counter!("gate_connections_accepted_total").increment(1);
}

pub fn set_active_connections(active: u64) {
    metrics::gauge!("gate_connections_active").set(active as f64);
}

pub fn record_admission(outcome: AdmissionOutcome) {
    metrics::counter!("gate_admissions_total", "outcome" => outcome.as_str()).increment(1);
}
