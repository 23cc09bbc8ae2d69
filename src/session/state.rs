//! Session state and its transition guard.

use std::sync::atomic::{AtomicU8, Ordering};

/// Admission state of one connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, INFO not yet queued.
    AwaitingBanner = 0,
    /// INFO sent, waiting for CONNECT.
    AwaitingConnect = 1,
    /// CONNECT verified; normal operation.
    Authenticated = 2,
    /// Authorization violation sent; closing.
    Rejected = 3,
    /// Closed for any other reason.
    Closed = 4,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Rejected | SessionState::Closed)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::AwaitingBanner,
            1 => SessionState::AwaitingConnect,
            2 => SessionState::Authenticated,
            3 => SessionState::Rejected,
            _ => SessionState::Closed,
        }
    }
}

/// Atomic holder for [`SessionState`].
///
/// Every transition goes through [`StateCell::claim`], so when the frame
/// path and the auth timer race out of `AwaitingConnect` exactly one wins.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from` → `to` if the cell still holds `from`.
    ///
    /// On failure returns the state actually observed.
    pub fn claim(&self, from: SessionState, to: SessionState) -> Result<(), SessionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SessionState::from_u8)
    }
}
