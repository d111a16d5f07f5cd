//! The `/login` exchange that trades Basic credentials for a session cookie.

use std::fmt;
use std::io::{BufRead, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cockpit_http::message::HEADER_SET_COOKIE;
use cockpit_http::{Endpoint, HttpError, HttpMessage, HttpVersion};
use tracing::{debug, info};

use super::cookie::{AuthCookie, AuthCookieGenerator};
use crate::error::ClientError;

pub const LOGIN_PATH: &str = "/login";
const SESSION_COOKIE: &str = "cockpit=";

/// Username and password for Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub fn build_login_request(endpoint: &Endpoint, cookie: &AuthCookie, credentials: &Credentials) -> HttpMessage {
    HttpMessage::request("GET", LOGIN_PATH, HttpVersion::Http11)
        .with_header("Host", &endpoint.host_header())
        .with_header("Cookie", &format!("{SESSION_COOKIE}{cookie}"))
        .with_header("Authorization", &credentials.basic_authorization())
        .with_header("Connection", "keep-alive")
}

/// Pull the `cockpit=<value>` token out of a login response.
pub fn extract_session_cookie(response: &HttpMessage) -> Result<String, ClientError> {
    let header = response
        .header(HEADER_SET_COOKIE)
        .ok_or_else(ClientError::missing_cookie)?;
    let (_, rest) = header
        .split_once(SESSION_COOKIE)
        .ok_or_else(ClientError::missing_cookie)?;
    let value = rest.split(';').next().unwrap_or_default().trim();
    if value.is_empty() {
        return Err(ClientError::missing_cookie());
    }
    Ok(value.to_string())
}

/// Run the login exchange on an open stream and return the session cookie.
pub fn login<S: BufRead + Write + ?Sized>(
    stream: &mut S,
    endpoint: &Endpoint,
    generator: &AuthCookieGenerator,
    credentials: &Credentials,
) -> Result<String, ClientError> {
    let request = build_login_request(endpoint, &generator.generate()?, credentials);
    debug!(host = %endpoint.host, user = %credentials.username, "sending login request");
    cockpit_http::send(&request, stream)?;

    let response = cockpit_http::receive(stream)?
        .error_for_status()
        .map_err(|e| match e {
            HttpError::Status { status, reason } => ClientError::Auth {
                status: Some(status),
                reason,
            },
            other => other.into(),
        })?;
    let cookie = extract_session_cookie(&response)?;
    info!(user = %credentials.username, "login succeeded");
    Ok(cookie)
}
