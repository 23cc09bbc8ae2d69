//! Auth timeout supervisor.
//!
//! # Responsibilities
//! - Bound the handshake window of one connection
//! - Force a rejection if CONNECT has not been accepted in time
//! - Guarantee the pending close is cancelled once admission settles
//!
//! The timer owns a spawned task. Dropping or disarming the [`AuthTimer`]
//! aborts it, and [`Session::on_timeout`] is itself a no-op once the session
//! has left `AwaitingConnect`, so a late fire can never close an admitted
//! or already-closed connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::machine::{Session, SessionAction};

/// Armed handshake deadline for one session.
#[derive(Debug)]
pub struct AuthTimer {
    handle: JoinHandle<()>,
}

impl AuthTimer {
    /// Start the grace period.
    ///
    /// If it elapses first, the actions produced by [`Session::on_timeout`]
    /// are passed to `on_fire`. Must be called within a Tokio runtime.
    pub fn arm<F>(session: Arc<Session>, grace: Duration, on_fire: F) -> Self
    where
        F: FnOnce(Vec<SessionAction>) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let actions = session.on_timeout();
            if actions.is_empty() {
                tracing::trace!(
                    connection_id = %session.id(),
                    "Auth timer fired after admission settled"
                );
                return;
            }

            tracing::warn!(
                connection_id = %session.id(),
                grace_ms = grace.as_millis() as u64,
                "Authentication timeout"
            );
            on_fire(actions);
        });

        Self { handle }
    }

    /// Cancel the timer.
    pub fn disarm(self) {
        drop(self);
    }

    /// Whether the timer task is still pending.
    pub fn is_armed(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for AuthTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AdmissionPolicy, Secret};
    use crate::net::ConnectionId;
    use crate::protocol::{ClientFrame, ConnectRequest, ServerInfo};
    use crate::session::machine::{CloseReason, Violation};
    use crate::session::state::SessionState;
    use tokio::sync::mpsc;

    fn pending_session() -> Arc<Session> {
        let policy = Arc::new(AdmissionPolicy::Token(Secret::parse("_YZZ22_").unwrap()));
        let session = Arc::new(Session::new(ConnectionId::next(), policy));
        session.announce(Arc::new(ServerInfo::new("127.0.0.1".into(), 0, true, 1024)));
        session
    }

    fn arm_into_channel(
        session: &Arc<Session>,
        grace: Duration,
    ) -> (AuthTimer, mpsc::UnboundedReceiver<Vec<SessionAction>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = AuthTimer::arm(Arc::clone(session), grace, move |actions| {
            let _ = tx.send(actions);
        });
        (timer, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_on_silent_peer() {
        let session = pending_session();
        let (_timer, mut fired) = arm_into_channel(&session, Duration::from_millis(500));

        let actions = fired.recv().await.unwrap();
        assert!(actions.contains(&SessionAction::Close(CloseReason::Violation(Violation::Timeout))));
        assert_eq!(session.state(), SessionState::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_fire() {
        let session = pending_session();
        let (timer, mut fired) = arm_into_channel(&session, Duration::from_millis(500));
        assert!(timer.is_armed());

        timer.disarm();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(fired.recv().await.is_none());
        assert_eq!(session.state(), SessionState::AwaitingConnect);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_after_admission_is_suppressed() {
        let session = pending_session();
        let (_timer, mut fired) = arm_into_channel(&session, Duration::from_millis(500));

        session.handle_frame(Ok(ClientFrame::Connect(ConnectRequest {
            auth_token: "_YZZ22_".into(),
            ..ConnectRequest::default()
        })));
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The task ran to completion without calling back.
        assert!(fired.recv().await.is_none());
        assert_eq!(session.state(), SessionState::Authenticated);
    }
}
