//! Admission state machine for a single connection.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────────┐ INFO queued ┌─────────────────┐ CONNECT ok ┌───────────────┐
//! │ AwaitingBanner │────────────>│ AwaitingConnect │───────────>│ Authenticated │
//! └────────────────┘             └─────────────────┘            └───────────────┘
//!                                         │ bad CONNECT / other frame /       │
//!                                         │ decode fault / auth timer         │ bad CONNECT
//!                                         ↓                                   ↓
//!                                   ┌──────────┐                        ┌──────────┐
//!                                   │ Rejected │<───────────────────────│ Rejected │
//!                                   └──────────┘                        └──────────┘
//! ```
//!
//! Any non-terminal state moves to `Closed` when the peer goes away.
//!
//! Methods return [`SessionAction`]s instead of doing I/O; the connection
//! driver executes them. The frame path and the auth timer both call into
//! the same [`Session`] and every state change is a single
//! compare-and-swap, so the loser of a race returns no actions at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::auth::{AdmissionPolicy, Verdict};
use crate::net::ConnectionId;
use crate::observability::metrics::{self, AdmissionOutcome};
use crate::protocol::{ClientFrame, ConnectRequest, ErrorKind, FrameError, ServerInfo, ServerReply};
use crate::session::state::{SessionState, StateCell};

/// Why an admission attempt was turned into an authorization violation.
///
/// Only used for logs and metrics; the peer sees the same error for all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    BadCredentials,
    MalformedHandshake,
    PrematureFrame,
    Timeout,
}

/// Why the driver should close the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Violation(Violation),
    ProtocolError,
}

/// Effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Send(ServerReply),
    Close(CloseReason),
    /// Hand the frame to the message router.
    Route(ClientFrame),
    /// Cancel the auth timer; admission is settled.
    DisarmTimer,
}

/// Per-connection admission state.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    policy: Arc<AdmissionPolicy>,
    state: StateCell,
    verbose: AtomicBool,
}

impl Session {
    pub fn new(id: ConnectionId, policy: Arc<AdmissionPolicy>) -> Self {
        Self {
            id,
            policy,
            state: StateCell::new(SessionState::AwaitingBanner),
            verbose: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Acquire)
    }

    /// Queue the INFO banner and open the handshake window.
    pub fn announce(&self, info: Arc<ServerInfo>) -> Vec<SessionAction> {
        match self
            .state
            .claim(SessionState::AwaitingBanner, SessionState::AwaitingConnect)
        {
            Ok(()) => vec![SessionAction::Send(ServerReply::Info(info))],
            Err(_) => Vec::new(),
        }
    }

    /// Process one decoded (or undecodable) frame from the peer.
    pub fn handle_frame(&self, frame: Result<ClientFrame, FrameError>) -> Vec<SessionAction> {
        match self.state.load() {
            SessionState::AwaitingConnect => self.admit(frame),
            SessionState::Authenticated => self.dispatch(frame),
            SessionState::AwaitingBanner => {
                self.reject(SessionState::AwaitingBanner, Violation::PrematureFrame)
            }
            SessionState::Rejected | SessionState::Closed => Vec::new(),
        }
    }

    /// Auth timer expiry. A no-op unless still `AwaitingConnect`.
    pub fn on_timeout(&self) -> Vec<SessionAction> {
        self.reject(SessionState::AwaitingConnect, Violation::Timeout)
    }

    /// Peer went away or the server is shutting down.
    ///
    /// Returns `true` if this call ended the session.
    pub fn on_disconnect(&self) -> bool {
        let mut current = self.state.load();
        while !current.is_terminal() {
            match self.state.claim(current, SessionState::Closed) {
                Ok(()) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    fn admit(&self, frame: Result<ClientFrame, FrameError>) -> Vec<SessionAction> {
        let request = match frame {
            Ok(ClientFrame::Connect(request)) => request,
            Ok(other) => {
                tracing::debug!(
                    connection_id = %self.id,
                    op = other.op_name(),
                    "Frame received before CONNECT"
                );
                return self.reject(SessionState::AwaitingConnect, Violation::PrematureFrame);
            }
            Err(FrameError::PayloadGated { op }) => {
                tracing::debug!(connection_id = %self.id, op, "Frame received before CONNECT");
                return self.reject(SessionState::AwaitingConnect, Violation::PrematureFrame);
            }
            Err(e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Undecodable handshake");
                return self.reject(SessionState::AwaitingConnect, Violation::MalformedHandshake);
            }
        };

        match self.policy.verify(&request) {
            Verdict::Accepted => self.accept(&request),
            Verdict::Rejected => {
                self.reject(SessionState::AwaitingConnect, Violation::BadCredentials)
            }
        }
    }

    fn accept(&self, request: &ConnectRequest) -> Vec<SessionAction> {
        if self
            .state
            .claim(SessionState::AwaitingConnect, SessionState::Authenticated)
            .is_err()
        {
            return Vec::new();
        }
        self.verbose.store(request.verbose, Ordering::Release);
        metrics::record_admission(AdmissionOutcome::Accepted);
        tracing::info!(
            connection_id = %self.id,
            mode = self.policy.mode().as_str(),
            client_name = %request.name,
            client_lang = %request.lang,
            "Client admitted"
        );

        let mut actions = vec![SessionAction::DisarmTimer];
        if request.verbose {
            actions.push(SessionAction::Send(ServerReply::Ok));
        }
        actions
    }

    fn dispatch(&self, frame: Result<ClientFrame, FrameError>) -> Vec<SessionAction> {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                if self
                    .state
                    .claim(SessionState::Authenticated, SessionState::Closed)
                    .is_err()
                {
                    return Vec::new();
                }
                tracing::warn!(connection_id = %self.id, error = %e, "Protocol error");
                return vec![
                    SessionAction::Send(ServerReply::Err(ErrorKind::from(&e))),
                    SessionAction::Close(CloseReason::ProtocolError),
                ];
            }
        };

        match frame {
            ClientFrame::Ping => vec![SessionAction::Send(ServerReply::Pong)],
            ClientFrame::Pong => Vec::new(),
            ClientFrame::Connect(request) => match self.policy.verify(&request) {
                Verdict::Accepted => {
                    self.verbose.store(request.verbose, Ordering::Release);
                    self.ack()
                }
                Verdict::Rejected => {
                    self.reject(SessionState::Authenticated, Violation::BadCredentials)
                }
            },
            routed => {
                let mut actions = vec![SessionAction::Route(routed)];
                actions.extend(self.ack());
                actions
            }
        }
    }

    fn ack(&self) -> Vec<SessionAction> {
        if self.is_verbose() {
            vec![SessionAction::Send(ServerReply::Ok)]
        } else {
            Vec::new()
        }
    }

    fn reject(&self, from: SessionState, cause: Violation) -> Vec<SessionAction> {
        if self.state.claim(from, SessionState::Rejected).is_err() {
            return Vec::new();
        }

        let outcome = match cause {
            Violation::Timeout => AdmissionOutcome::Timeout,
            _ => AdmissionOutcome::Rejected,
        };
        metrics::record_admission(outcome);
        tracing::warn!(connection_id = %self.id, cause = ?cause, "Authorization violation");

        vec![
            SessionAction::Send(ServerReply::Err(ErrorKind::AuthorizationViolation)),
            SessionAction::Close(CloseReason::Violation(cause)),
        ]
    }
}
