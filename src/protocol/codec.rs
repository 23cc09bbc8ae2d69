//! Frame reader over a buffered byte stream.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::protocol::frame::{parse_control_line, ClientFrame, ControlLine, FrameError, Publish};

/// Size limits enforced while decoding.
#[derive(Debug, Clone, Copy)]
pub struct FrameLimits {
    pub max_control_line: usize,
    pub max_payload: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_control_line: 4096,
            max_payload: 1024 * 1024,
        }
    }
}

/// Reads client frames one at a time.
///
/// Outer `Result` is transport failure; `Ok(None)` is a clean EOF; the
/// inner `Result` is a decode fault for a single frame.
///
/// While gated, a `PUB` header fails with [`FrameError::PayloadGated`]
/// before any of its payload is read or buffered.
pub struct FrameReader<R> {
    inner: R,
    limits: FrameLimits,
    line: Vec<u8>,
    gated: bool,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, limits: FrameLimits) -> Self {
        Self {
            inner,
            limits,
            line: Vec::with_capacity(256),
            gated: false,
        }
    }

    pub fn set_gated(&mut self, gated: bool) {
        self.gated = gated;
    }

    pub async fn next_frame(&mut self) -> io::Result<Option<Result<ClientFrame, FrameError>>> {
        self.line.clear();
        // +2 leaves room for the CRLF terminator.
        let budget = self.limits.max_control_line as u64 + 2;
        let read = (&mut self.inner)
            .take(budget)
            .read_until(b'\n', &mut self.line)
            .await?;

        if read == 0 {
            return Ok(None);
        }
        if !self.line.ends_with(b"\n") {
            if read as u64 >= budget {
                return Ok(Some(Err(FrameError::ControlLineTooLong {
                    limit: self.limits.max_control_line,
                })));
            }
            // EOF in the middle of a line.
            return Ok(None);
        }

        let line = trim_crlf(&self.line);
        let Ok(text) = std::str::from_utf8(line) else {
            return Ok(Some(Err(FrameError::InvalidUtf8)));
        };

        match parse_control_line(text) {
            Ok(ControlLine::Complete(frame)) => Ok(Some(Ok(frame))),
            Ok(ControlLine::PubHeader {
                subject,
                reply_to,
                size,
            }) => {
                if self.gated {
                    return Ok(Some(Err(FrameError::PayloadGated { op: "PUB" })));
                }
                let too_large = FrameError::PayloadTooLarge {
                    size,
                    limit: self.limits.max_payload,
                };
                if size > self.limits.max_payload {
                    return Ok(Some(Err(too_large)));
                }
                let Some(framed) = size.checked_add(2) else {
                    return Ok(Some(Err(too_large)));
                };
                let mut payload = vec![0u8; framed];
                self.inner.read_exact(&mut payload).await?;
                if !payload.ends_with(b"\r\n") {
                    return Ok(Some(Err(FrameError::MissingPayloadTerminator)));
                }
                payload.truncate(size);
                Ok(Some(Ok(ClientFrame::Pub(Publish {
                    subject,
                    reply_to,
                    payload,
                }))))
            }
            Err(e) => Ok(Some(Err(e))),
        }
    }
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(input: &'static [u8]) -> FrameReader<&'static [u8]> {
        FrameReader::new(input, FrameLimits::default())
    }

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let mut frames = reader(b"CONNECT {\"verbose\":true}\r\nPUB foo 2\r\nok\r\nPING\r\n");

        let first = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert!(first.is_handshake());

        let second = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert_eq!(
            second,
            ClientFrame::Pub(Publish {
                subject: "foo".into(),
                reply_to: None,
                payload: b"ok".to_vec(),
            })
        );

        let third = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert_eq!(third, ClientFrame::Ping);

        assert!(frames.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn accepts_bare_newline() {
        let mut frames = reader(b"PING\n");
        let frame = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert_eq!(frame, ClientFrame::Ping);
    }

    #[tokio::test]
    async fn oversized_control_line() {
        let mut frames = FrameReader::new(
            &b"PUB a.very.long.subject.name 1\r\nx\r\n"[..],
            FrameLimits {
                max_control_line: 8,
                max_payload: 16,
            },
        );
        let result = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(result, Err(FrameError::ControlLineTooLong { limit: 8 })));
    }

    #[tokio::test]
    async fn oversized_payload() {
        let mut frames = FrameReader::new(
            &b"PUB foo 32\r\n"[..],
            FrameLimits {
                max_control_line: 64,
                max_payload: 16,
            },
        );
        let result = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 32, limit: 16 })
        ));
    }

    #[tokio::test]
    async fn payload_must_end_with_crlf() {
        let mut frames = reader(b"PUB foo 2\r\nokXX");
        let result = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(result, Err(FrameError::MissingPayloadTerminator)));
    }

    #[tokio::test]
    async fn truncated_line_is_eof() {
        let mut frames = reader(b"CONNE");
        assert!(frames.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decode_fault_does_not_end_stream() {
        let mut frames = reader(b"CONNECT {bad\r\nPING\r\n");
        let first = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(first, Err(FrameError::MalformedConnect(_))));
        let second = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert_eq!(second, ClientFrame::Ping);
    }

    #[tokio::test]
    async fn gated_pub_skips_payload() {
        // Header only: the body never arrives.
        let mut frames = reader(b"PUB foo 100000\r\n");
        frames.set_gated(true);
        let result = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(result, Err(FrameError::PayloadGated { op: "PUB" })));
    }

    #[tokio::test]
    async fn ungating_reads_payloads_again() {
        let mut frames = reader(b"PUB foo 2\r\nok\r\n");
        frames.set_gated(true);
        frames.set_gated(false);
        let frame = frames.next_frame().await.unwrap().unwrap().unwrap();
        assert!(matches!(frame, ClientFrame::Pub(Publish { payload, .. }) if payload == b"ok"));
    }

    #[tokio::test]
    async fn payload_size_at_usize_max_does_not_overflow() {
        let line = format!("PUB foo {}\r\n", usize::MAX);
        let mut frames = FrameReader::new(
            line.as_bytes(),
            FrameLimits {
                max_control_line: 64,
                max_payload: usize::MAX,
            },
        );
        let result = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }
}
