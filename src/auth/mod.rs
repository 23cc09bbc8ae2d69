//! Credential store.
//!
//! # Data Flow
//! ```text
//! [auth] config section
//!     → policy.rs (pick None / Token / UserPass from populated fields)
//!     → secret.rs (classify each secret as plaintext or bcrypt, once)
//!     → AdmissionPolicy (immutable, shared via Arc)
//!
//! Per CONNECT:
//!     ConnectRequest → AdmissionPolicy::verify → Verdict
//! ```
//!
//! # Design Decisions
//! - Malformed hashes are a startup error, never a connection-time one
//! - Plaintext comparison is constant-time; bcrypt handles hashed secrets
//! - Pure computation: no I/O, no locking

pub mod policy;
pub mod secret;

pub use policy::{AdmissionMode, AdmissionPolicy, PolicyError, Verdict};
pub use secret::{HashAlgorithm, HashedSecret, Secret, SecretError};
