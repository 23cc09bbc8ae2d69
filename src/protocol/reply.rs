//! Server → client control lines.

use std::sync::Arc;

use crate::protocol::frame::FrameError;
use crate::protocol::info::ServerInfo;

/// Error text carried by a `-ERR` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Every failed, skipped or late authentication.
    AuthorizationViolation,
    UnknownOperation,
    MaxPayload,
    MaxControlLine,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::AuthorizationViolation => "Authorization Violation",
            ErrorKind::UnknownOperation => "Unknown Protocol Operation",
            ErrorKind::MaxPayload => "Maximum Payload Violation",
            ErrorKind::MaxControlLine => "Maximum Control Line Exceeded",
        }
    }
}

impl From<&FrameError> for ErrorKind {
    fn from(err: &FrameError) -> Self {
        match err {
            FrameError::PayloadTooLarge { .. } => ErrorKind::MaxPayload,
            FrameError::ControlLineTooLong { .. } => ErrorKind::MaxControlLine,
            _ => ErrorKind::UnknownOperation,
        }
    }
}

/// A line the server writes to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    Info(Arc<ServerInfo>),
    Ok,
    Pong,
    Err(ErrorKind),
    /// Pre-encoded bytes produced by the message router.
    Raw(Vec<u8>),
}

impl ServerReply {
    /// Encode to wire bytes, CRLF included.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let bytes = match self {
            ServerReply::Info(info) => {
                let mut out = b"INFO ".to_vec();
                serde_json::to_writer(&mut out, info.as_ref())?;
                out.extend_from_slice(b"\r\n");
                out
            }
            ServerReply::Ok => b"+OK\r\n".to_vec(),
            ServerReply::Pong => b"PONG\r\n".to_vec(),
            ServerReply::Err(kind) => format!("-ERR '{}'\r\n", kind.message()).into_bytes(),
            ServerReply::Raw(bytes) => bytes.clone(),
        };
        Ok(bytes)
    }
}
