//! Client for the Cockpit web service protocol.
//!
//! A session logs in over HTTP (`/login`), upgrades the same connection to a
//! WebSocket, and then multiplexes channels over text frames of the form
//! `"<channel>\n<payload>"`. The empty channel carries JSON control commands.
//!
//! ```no_run
//! use cockpit_client::{Bus, RemoteDbus, SessionConfig};
//!
//! let config = SessionConfig::new("wss://server:9090/cockpit/socket");
//! let mut remote = RemoteDbus::connect(&config, "admin", "secret", "org.freedesktop.hostname1")?;
//! let reply = remote.call(
//!     "/org/freedesktop/hostname1",
//!     "org.freedesktop.DBus.Properties",
//!     "Get",
//!     &["org.freedesktop.hostname1".into(), "Hostname".into()],
//!     true,
//! )?;
//! println!("{:?}", reply);
//! remote.close("")?;
//! # let _ = Bus::System;
//! # Ok::<(), cockpit_client::ClientError>(())
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod remote;
pub mod session;
pub mod transport;

pub use auth::{AuthCookie, AuthCookieGenerator, Credentials, NonceCounter};
pub use config::SessionConfig;
pub use error::ClientError;
pub use remote::{Bus, RemoteDbus};
pub use session::{
    ChannelIds, ControlMessage, Frame, OpenChannel, PayloadType, Session, SessionState,
    CONTROL_CHANNEL,
};
pub use transport::{Transport, TransportError, WebSocket, WebSocketOptions};
