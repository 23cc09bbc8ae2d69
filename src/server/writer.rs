//! Socket writer task.
//!
//! Drains the outbound queue onto the socket. Every queued reply is written
//! before a close request is honored, so `-ERR` always precedes the FIN.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::protocol::ServerReply;
use crate::server::outbox::Outbox;

/// Run until the outbox closes or the socket fails.
pub async fn run_writer<W>(
    mut sink: W,
    mut queue: mpsc::Receiver<ServerReply>,
    outbox: Outbox,
    deadline: Duration,
) where
    W: AsyncWrite + Unpin,
{
    let id = outbox.id();
    let mut closing = outbox.closing();

    loop {
        tokio::select! {
            biased;
            reply = queue.recv() => {
                let Some(reply) = reply else { break };
                if !write_reply(&mut sink, &reply, deadline, &outbox).await {
                    outbox.close();
                    return;
                }
            }
            _ = async { let _ = closing.wait_for(|closing| *closing).await; } => {
                while let Ok(reply) = queue.try_recv() {
                    if !write_reply(&mut sink, &reply, deadline, &outbox).await {
                        return;
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = sink.shutdown().await {
        tracing::debug!(connection_id = %id, error = %e, "Socket shutdown failed");
    }
}

async fn write_reply<W>(sink: &mut W, reply: &ServerReply, deadline: Duration, outbox: &Outbox) -> bool
where
    W: AsyncWrite + Unpin,
{
    let bytes = match reply.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(connection_id = %outbox.id(), error = %e, "Failed to encode reply");
            return true;
        }
    };

    match tokio::time::timeout(deadline, sink.write_all(&bytes)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(connection_id = %outbox.id(), error = %e, "Write failed");
            false
        }
        Err(_) => {
            tracing::warn!(
                connection_id = %outbox.id(),
                deadline_ms = deadline.as_millis() as u64,
                "Write deadline exceeded"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ConnectionId;
    use crate::protocol::ErrorKind;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn flushes_queue_before_closing() {
        let (client, server) = tokio::io::duplex(1024);
        let (outbox, queue) = Outbox::new(ConnectionId::next(), 8);

        outbox.send(ServerReply::Pong);
        outbox.send(ServerReply::Err(ErrorKind::AuthorizationViolation));
        outbox.close();

        run_writer(server, queue, outbox, Duration::from_secs(1)).await;

        let mut client = client;
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "PONG\r\n-ERR 'Authorization Violation'\r\n");
    }
}
