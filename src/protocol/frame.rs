//! Client → server frames.

use thiserror::Error;

use crate::protocol::connect::ConnectRequest;

/// Error decoding one frame. The connection is closed after any of these.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unknown protocol operation '{0}'")]
    UnknownOperation(String),

    #[error("malformed {op} arguments")]
    MalformedArguments { op: &'static str },

    #[error("malformed CONNECT payload: {0}")]
    MalformedConnect(#[from] serde_json::Error),

    #[error("control line exceeds {limit} bytes")]
    ControlLineTooLong { limit: usize },

    #[error("payload of {size} bytes exceeds maximum {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("payload is not terminated by CRLF")]
    MissingPayloadTerminator,

    #[error("control line is not valid UTF-8")]
    InvalidUtf8,

    #[error("{op} payload refused before CONNECT")]
    PayloadGated { op: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub subject: String,
    pub reply_to: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub subject: String,
    pub queue: Option<String>,
    pub sid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    pub sid: String,
    pub max: Option<u64>,
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Connect(ConnectRequest),
    Ping,
    Pong,
    Pub(Publish),
    Sub(Subscribe),
    Unsub(Unsubscribe),
}

impl ClientFrame {
    /// Whether this is the CONNECT handshake.
    pub fn is_handshake(&self) -> bool {
        matches!(self, ClientFrame::Connect(_))
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            ClientFrame::Connect(_) => "CONNECT",
            ClientFrame::Ping => "PING",
            ClientFrame::Pong => "PONG",
            ClientFrame::Pub(_) => "PUB",
            ClientFrame::Sub(_) => "SUB",
            ClientFrame::Unsub(_) => "UNSUB",
        }
    }
}

/// A parsed control line. `PUB` still needs its payload read.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ControlLine {
    Complete(ClientFrame),
    PubHeader {
        subject: String,
        reply_to: Option<String>,
        size: usize,
    },
}

/// Parse one control line, CRLF already stripped.
pub(crate) fn parse_control_line(line: &str) -> Result<ControlLine, FrameError> {
    let line = line.trim_start();
    let (op, rest) = match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, ""),
    };

    let frame = match op.to_ascii_uppercase().as_str() {
        "CONNECT" => ClientFrame::Connect(ConnectRequest::decode(rest)?),
        "PING" => ClientFrame::Ping,
        "PONG" => ClientFrame::Pong,
        "PUB" => return parse_pub(rest),
        "SUB" => parse_sub(rest)?,
        "UNSUB" => parse_unsub(rest)?,
        _ => return Err(FrameError::UnknownOperation(op.to_string())),
    };
    Ok(ControlLine::Complete(frame))
}

fn parse_pub(args: &str) -> Result<ControlLine, FrameError> {
    let malformed = || FrameError::MalformedArguments { op: "PUB" };
    let parts: Vec<&str> = args.split_whitespace().collect();
    let (subject, reply_to, size) = match parts.as_slice() {
        [subject, size] => (*subject, None, *size),
        [subject, reply_to, size] => (*subject, Some(reply_to.to_string()), *size),
        _ => return Err(malformed()),
    };
    let size = size.parse().map_err(|_| malformed())?;
    Ok(ControlLine::PubHeader {
        subject: subject.to_string(),
        reply_to,
        size,
    })
}

fn parse_sub(args: &str) -> Result<ClientFrame, FrameError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let (subject, queue, sid) = match parts.as_slice() {
        [subject, sid] => (*subject, None, *sid),
        [subject, queue, sid] => (*subject, Some(queue.to_string()), *sid),
        _ => return Err(FrameError::MalformedArguments { op: "SUB" }),
    };
    Ok(ClientFrame::Sub(Subscribe {
        subject: subject.to_string(),
        queue,
        sid: sid.to_string(),
    }))
}

fn parse_unsub(args: &str) -> Result<ClientFrame, FrameError> {
    let malformed = || FrameError::MalformedArguments { op: "UNSUB" };
    let parts: Vec<&str> = args.split_whitespace().collect();
    let (sid, max) = match parts.as_slice() {
        [sid] => (*sid, None),
        [sid, max] => (*sid, Some(max.parse().map_err(|_| malformed())?)),
        _ => return Err(malformed()),
    };
    Ok(ClientFrame::Unsub(Unsubscribe {
        sid: sid.to_string(),
        max,
    }))
}
