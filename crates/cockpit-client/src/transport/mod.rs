//! Transport layer: the text-frame channel a [`Session`](crate::Session) runs on.
//!
//! The session only depends on the [`Transport`] trait. [`WebSocket`] is the
//! concrete implementation (TCP, optional TLS, RFC 6455 client framing):
//! - **Frame codec** (`frame`): Client-side frame reading and masked writing
//! - **Handshake** (`handshake`): HTTP upgrade request and `101` validation
//! - **Close** (`close`): Close payloads and control-frame dispatch
//! - **TLS** (`tls`): rustls client configuration and the plain/TLS stream

pub mod close;
pub mod frame;
pub mod handshake;
pub mod tls;
pub mod websocket;

use std::io::{self, BufRead, Write};

use cockpit_http::Endpoint;

pub use websocket::{WebSocket, WebSocketOptions};

/// Errors raised by a transport. The session passes these through untouched.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid hostname for TLS: {0}")]
    InvalidServerName(String),

    #[error("no address found for {0}")]
    HostNotFound(String),

    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    #[error("WebSocket frame error: {0}")]
    Frame(String),

    #[error("connection closed by peer (code {code}): {reason}")]
    Closed { code: u16, reason: String },

    #[error("transport is not connected")]
    NotConnected,
}

/// Raw byte access to a connected transport, used for the login exchange
/// before the WebSocket upgrade.
pub trait RawStream: BufRead + Write {}

impl<T: BufRead + Write> RawStream for T {}

/// Bidirectional text transport.
///
/// Calls block until the underlying I/O completes; timeouts, if any, are the
/// implementation's.
pub trait Transport {
    /// Open the byte stream to `endpoint` (TCP, plus TLS when secure).
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// The connected byte stream, before or instead of framing.
    fn stream(&mut self) -> Result<&mut dyn RawStream, TransportError>;

    /// Upgrade the connected stream, sending `headers` with the upgrade request.
    fn handshake(&mut self, headers: &[(String, String)]) -> Result<(), TransportError>;

    /// Send one text message.
    fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Block until the next text message arrives.
    fn receive(&mut self) -> Result<String, TransportError>;

    /// Close the connection. Closing an unconnected transport is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}
