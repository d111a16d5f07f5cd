//! HTTP message data types.
//!
//! An [`HttpMessage`] is an initial line, an ordered header list and a raw
//! body. Framing decisions (chunked vs. `Content-Length` vs. EOF) are made by
//! the [`reader`](crate::reader) and [`sender`](crate::sender) modules from
//! the headers stored here.

use std::fmt;
use std::str::FromStr;

use crate::error::HttpError;

pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const HEADER_SET_COOKIE: &str = "Set-Cookie";
pub const CHUNKED: &str = "chunked";

/// HTTP protocol versions understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HttpVersion {
    /// `HTTP/0.9`: no headers on the wire, body only after the initial line.
    Http09,
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::Http09 => "HTTP/0.9",
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }

    /// Whether messages of this version carry a header block.
    pub fn has_headers(self) -> bool {
        self != HttpVersion::Http09
    }

    /// Whether chunked transfer coding may be used when sending.
    pub fn supports_chunked(self) -> bool {
        self == HttpVersion::Http11
    }
}

impl FromStr for HttpVersion {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/0.9" => Ok(HttpVersion::Http09),
            "HTTP/1.0" => Ok(HttpVersion::Http10),
            "HTTP/1.1" => Ok(HttpVersion::Http11),
            other => Err(HttpError::MalformedInitLine(format!(
                "unsupported version {other}"
            ))),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first line of an HTTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitLine {
    Request {
        method: String,
        target: String,
        version: HttpVersion,
    },
    Response {
        version: HttpVersion,
        status: u16,
        /// Empty when the peer sent no reason phrase.
        reason: String,
    },
}

impl InitLine {
    pub fn version(&self) -> HttpVersion {
        match self {
            InitLine::Request { version, .. } | InitLine::Response { version, .. } => *version,
        }
    }
}

impl fmt::Display for InitLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitLine::Request {
                method,
                target,
                version,
            } => write!(f, "{method} {target} {version}"),
            InitLine::Response {
                version,
                status,
                reason,
            } => {
                write!(f, "{version} {status}")?;
                if *version == HttpVersion::Http09 {
                    return Ok(());
                }
                let reason = if reason.is_empty() {
                    canonical_reason(*status).unwrap_or("")
                } else {
                    reason.as_str()
                };
                if !reason.is_empty() {
                    write!(f, " {reason}")?;
                }
                Ok(())
            }
        }
    }
}

/// Ordered header list.
///
/// Names keep the case they were given or received with. Setting an existing
/// name (exact match) replaces its value without moving it; lookups through
/// [`Headers::get_ignore_case`] are used wherever framing depends on a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True if `Transfer-Encoding` (any case) is `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.get_ignore_case(HEADER_TRANSFER_ENCODING)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(CHUNKED))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.set(k, v);
        }
        headers
    }
}

/// A single HTTP request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage {
    pub init_line: InitLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpMessage {
    pub fn new(init_line: InitLine, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            init_line,
            headers,
            body,
        }
    }

    /// A request with no headers and an empty body.
    pub fn request(method: &str, target: &str, version: HttpVersion) -> Self {
        Self::new(
            InitLine::Request {
                method: method.to_string(),
                target: target.to_string(),
                version,
            },
            Headers::new(),
            Vec::new(),
        )
    }

    /// A response with no headers and an empty body.
    pub fn response(version: HttpVersion, status: u16, reason: &str) -> Self {
        Self::new(
            InitLine::Response {
                version,
                status,
                reason: reason.to_string(),
            },
            Headers::new(),
            Vec::new(),
        )
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_ignore_case(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn version(&self) -> HttpVersion {
        self.init_line.version()
    }

    pub fn is_chunked(&self) -> bool {
        self.headers.is_chunked()
    }

    /// Status code of a response, `None` for requests.
    pub fn status(&self) -> Option<u16> {
        match &self.init_line {
            InitLine::Response { status, .. } => Some(*status),
            InitLine::Request { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.init_line {
            InitLine::Response { reason, .. } => Some(reason.as_str()),
            InitLine::Request { .. } => None,
        }
    }

    /// True only for responses with a status in `200..300`.
    pub fn is_success(&self) -> bool {
        self.status().is_some_and(is_success_status)
    }

    /// Turn a non-success response into [`HttpError::Status`].
    ///
    /// Requests pass through unchanged, as do 2xx responses.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        match &self.init_line {
            InitLine::Response { status, reason, .. } if !is_success_status(*status) => {
                Err(HttpError::Status {
                    status: *status,
                    reason: reason.clone(),
                })
            }
            _ => Ok(self),
        }
    }
}

pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Standard reason phrase for a status code.
pub fn canonical_reason(status: u16) -> Option<&'static str> {
    let reason = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    };
    Some(reason)
}
