use std::io;

/// Errors produced while reading or writing an HTTP message.
///
/// None of these are retried: a malformed message aborts the exchange it
/// belongs to.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The initial line is neither a status line nor a three-token request line.
    #[error("malformed initial line: {0:?}")]
    MalformedInitLine(String),

    /// A header line had no `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// `Content-Length` could not be parsed as a byte count.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// A chunk-size line was not a hexadecimal length.
    #[error("malformed chunk size: {0:?}")]
    MalformedChunkSize(String),

    /// A line of the message head was not valid UTF-8.
    #[error("message head is not valid UTF-8")]
    InvalidUtf8,

    /// The stream ended while part of the message was still expected.
    #[error("unexpected end of stream while reading {0}")]
    UnexpectedEof(&'static str),

    /// A response carried a non-success status code.
    #[error("HTTP {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors produced by [`parse_url`](crate::parse_url).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("url is invalid: {0:?}")]
    Invalid(String),

    #[error("scheme {0:?} is invalid")]
    UnsupportedScheme(String),

    #[error("hostname is invalid")]
    MissingHost,

    #[error("invalid port: {0:?}")]
    InvalidPort(String),
}
