//! Connection admission.
//!
//! # Data Flow
//! ```text
//! accept → Session::announce (INFO) → AuthTimer::arm
//!     frame path: FrameReader → Session::handle_frame → actions
//!     timer path: grace elapsed → Session::on_timeout → actions
//!     both paths claim transitions on one StateCell
//! ```
//!
//! # Design Decisions
//! - The state machine is pure; the connection driver performs all I/O
//! - One compare-and-swap decides every exit from `AwaitingConnect`
//! - Every failure, whatever its cause, looks identical to the peer

pub mod machine;
pub mod state;
pub mod timeout;

pub use machine::{CloseReason, Session, SessionAction, Violation};
pub use state::{SessionState, StateCell};
pub use timeout::AuthTimer;
