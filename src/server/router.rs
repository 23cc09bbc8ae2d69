//! Hand-off point to the broker core.
//!
//! Admission only decides who gets in. Whatever an admitted client sends
//! after that is given to a [`MessageRouter`].

use crate::net::ConnectionId;
use crate::protocol::{ClientFrame, ServerReply};

/// Receives frames from admitted connections.
///
/// Implementations must not block: `route` is called on the connection's
/// read loop.
pub trait MessageRouter: Send + Sync + 'static {
    /// Handle one frame and return replies for the sender.
    fn route(&self, connection: ConnectionId, frame: ClientFrame) -> Vec<ServerReply>;

    /// The connection has gone away.
    fn disconnected(&self, _connection: ConnectionId) {}
}

/// Router that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRouter;

impl MessageRouter for NullRouter {
    fn route(&self, connection: ConnectionId, frame: ClientFrame) -> Vec<ServerReply> {
        tracing::trace!(connection_id = %connection, op = frame.op_name(), "Frame discarded");
        Vec::new()
    }
}
