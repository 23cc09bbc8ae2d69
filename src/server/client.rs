//! Per-connection driver.
//!
//! # Responsibilities
//! - Send the INFO banner and arm the auth timer
//! - Refuse PUB payloads until the session is admitted
//! - Feed decoded frames into the [`Session`] and execute its actions
//! - Tear the connection down when the session, the peer or the server ends it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::broadcast;

use crate::auth::AdmissionPolicy;
use crate::net::ConnectionGuard;
use crate::protocol::{ClientFrame, FrameError, FrameLimits, FrameReader, ServerInfo};
use crate::server::outbox::Outbox;
use crate::server::router::MessageRouter;
use crate::server::writer::run_writer;
use crate::session::{AuthTimer, CloseReason, Session, SessionAction, SessionState};

/// Everything a connection driver shares with its siblings.
pub(crate) struct ClientContext {
    pub policy: Arc<AdmissionPolicy>,
    pub info: Arc<ServerInfo>,
    pub router: Arc<dyn MessageRouter>,
    pub limits: FrameLimits,
    pub outbound_queue: usize,
    pub auth_timeout: Duration,
    pub write_deadline: Duration,
}

/// Drive one connection from banner to close.
pub(crate) async fn serve_client<S>(
    stream: S,
    peer: SocketAddr,
    guard: ConnectionGuard,
    ctx: Arc<ClientContext>,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let id = guard.id();
    tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection opened");

    let session = Arc::new(Session::new(id, Arc::clone(&ctx.policy)));
    let (read_half, write_half) = tokio::io::split(stream);
    let (outbox, queue) = Outbox::new(id, ctx.outbound_queue);
    let writer = tokio::spawn(run_writer(
        write_half,
        queue,
        outbox.clone(),
        ctx.write_deadline,
    ));
    let mut closing = outbox.closing();

    outbox.apply(session.announce(Arc::clone(&ctx.info)));

    let on_fire = outbox.clone();
    let mut timer = Some(AuthTimer::arm(
        Arc::clone(&session),
        ctx.auth_timeout,
        move |actions| on_fire.apply(actions),
    ));

    let mut frames = FrameReader::new(BufReader::new(read_half), ctx.limits);
    loop {
        frames.set_gated(session.state() != SessionState::Authenticated);
        let frame = tokio::select! {
            _ = async { let _ = closing.wait_for(|closing| *closing).await; } => break,
            _ = shutdown.recv() => {
                tracing::debug!(connection_id = %id, "Closing for shutdown");
                break;
            }
            next = frames.next_frame() => match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::debug!(connection_id = %id, "Peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %id, error = %e, "Read failed");
                    break;
                }
            },
        };

        let actions = process(&session, frame).await;
        for action in actions {
            match action {
                SessionAction::Send(reply) => {
                    outbox.send(reply);
                }
                SessionAction::Close(reason) => {
                    tracing::debug!(connection_id = %id, reason = ?reason, "Closing connection");
                    outbox.close();
                }
                SessionAction::Route(frame) => {
                    for reply in ctx.router.route(id, frame) {
                        outbox.send(reply);
                    }
                }
                SessionAction::DisarmTimer => {
                    if let Some(timer) = timer.take() {
                        timer.disarm();
                    }
                }
            }
        }
    }

    session.on_disconnect();
    drop(timer);
    ctx.router.disconnected(id);
    outbox.close();
    if let Err(e) = writer.await {
        tracing::warn!(connection_id = %id, error = %e, "Writer task failed");
    }

    tracing::debug!(
        connection_id = %id,
        peer_addr = %peer,
        final_state = ?session.state(),
        "Connection closed"
    );
}

/// Run one frame through the session.
///
/// CONNECT may carry a bcrypt check, so it runs on the blocking pool.
async fn process(session: &Arc<Session>, frame: Result<ClientFrame, FrameError>) -> Vec<SessionAction> {
    if !matches!(frame, Ok(ClientFrame::Connect(_))) {
        return session.handle_frame(frame);
    }

    let session = Arc::clone(session);
    let id = session.id();
    match tokio::task::spawn_blocking(move || session.handle_frame(frame)).await {
        Ok(actions) => actions,
        Err(e) => {
            tracing::error!(connection_id = %id, error = %e, "Credential check failed");
            vec![SessionAction::Close(CloseReason::ProtocolError)]
        }
    }
}
