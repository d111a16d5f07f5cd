use std::fmt;

/// Lifecycle of a [`Session`](super::Session).
///
/// ```text
/// Disconnected -> TransportConnected -> Authenticated -> HandshakePending -> Ready -> Closed
/// ```
///
/// Any failure while connecting also ends in `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    TransportConnected,
    Authenticated,
    HandshakePending,
    Ready,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::TransportConnected => "transport-connected",
            SessionState::Authenticated => "authenticated",
            SessionState::HandshakePending => "handshake-pending",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
