//! Minimal HTTP/1.1 message model used by the Cockpit client.
//!
//! Provides:
//! - **Message** (`message`): Initial line, ordered headers and body of one request or response
//! - **Reader** (`reader`): Blocking parser with `Content-Length`, chunked and EOF body framing
//! - **Sender** (`sender`): Writer with chunked transfer coding for HTTP/1.1
//! - **URL** (`url`): Endpoint parsing with `ws`/`wss`/`http`/`https` normalization
//!
//! Everything operates on `std::io` traits; the crate never opens a socket.

pub mod error;
pub mod message;
pub mod reader;
pub mod sender;
pub mod url;

pub use error::{HttpError, UrlError};
pub use message::{canonical_reason, is_success_status, Headers, HttpMessage, HttpVersion, InitLine};
pub use reader::{read_body, read_head, receive};
pub use sender::{send, CHUNK_MAX};
pub use url::{parse_url, Endpoint, Scheme};
