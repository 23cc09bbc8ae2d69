//! Per-connection outbound queue.
//!
//! Every writer to a connection (the read loop, the auth timer) goes through
//! an [`Outbox`]. Enqueueing never blocks: a peer that stops reading fills
//! its queue and gets disconnected instead of stalling the caller.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::net::ConnectionId;
use crate::protocol::ServerReply;
use crate::session::SessionAction;

#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::Sender<ServerReply>,
    closing: Arc<watch::Sender<bool>>,
}

impl Outbox {
    /// Create an outbox and the queue receiver handed to the writer task.
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<ServerReply>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closing, _) = watch::channel(false);
        let outbox = Self {
            id,
            tx,
            closing: Arc::new(closing),
        };
        (outbox, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a reply. Returns `false` if it was dropped.
    pub fn send(&self, reply: ServerReply) -> bool {
        if self.is_closing() {
            return false;
        }
        match self.tx.try_send(reply) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Slow consumer, closing connection");
                self.close();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the writer to flush what is queued and shut the socket.
    pub fn close(&self) {
        self.closing.send_replace(true);
    }

    pub fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    /// A receiver that observes [`Outbox::close`].
    pub fn closing(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }

    /// Apply the I/O half of a batch of session actions.
    ///
    /// Routing and timer actions are the driver's business and are ignored.
    pub fn apply(&self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::Send(reply) => {
                    self.send(reply);
                }
                SessionAction::Close(_) => self.close(),
                SessionAction::Route(_) | SessionAction::DisarmTimer => {}
            }
        }
    }
}
