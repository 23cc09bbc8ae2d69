//! Text wire protocol.
//!
//! # Data Flow
//! ```text
//! Socket bytes
//!     → codec.rs (control line + optional payload, size limits)
//!     → frame.rs (ClientFrame / FrameError)
//!     → connect.rs (CONNECT json → ConnectRequest)
//!
//! Outbound:
//!     ServerReply (reply.rs) → bytes; INFO carries ServerInfo (info.rs)
//! ```
//!
//! Only the pieces admission depends on are modelled in detail; routed
//! frames are handed to the message router as-is.

pub mod codec;
pub mod connect;
pub mod frame;
pub mod info;
pub mod reply;

pub use codec::{FrameLimits, FrameReader};
pub use connect::ConnectRequest;
pub use frame::{ClientFrame, FrameError, Publish, Subscribe, Unsubscribe};
pub use info::ServerInfo;
pub use reply::{ErrorKind, ServerReply};
