//! Connection admission gate for a NATS-style publish/subscribe broker.
//!
//! Every client must pass a CONNECT handshake (shared token, user/password,
//! or nothing at all) within a bounded grace period before any other frame
//! reaches the broker core.

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod session;

pub use auth::{AdmissionMode, AdmissionPolicy, Secret};
pub use config::GateConfig;
pub use error::GateError;
pub use lifecycle::Shutdown;
pub use server::{GateServer, MessageRouter, NullRouter};
