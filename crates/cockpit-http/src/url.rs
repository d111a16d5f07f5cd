//! Endpoint URL parsing.
//!
//! Accepts `scheme://host[:port]/path[?query]` with `ws`, `wss`, `http` or
//! `https` and normalizes it to the HTTP scheme the login exchange runs on.

use std::fmt;

use crate::error::UrlError;

/// Normalized scheme: `ws` maps to `http`, `wss` to `https`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Path plus `?query`, never empty (`/` at minimum).
    pub resource: String,
    pub is_secure: bool,
}

impl Endpoint {
    /// `host:port`, as sent in the `Host` header.
    pub fn host_header(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// `scheme://host:port`, as sent in the WebSocket `Origin` header.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host_header())
    }
}

/// Parse an endpoint URL.
///
/// # Examples
///
/// ```
/// use cockpit_http::{parse_url, Scheme};
///
/// let ep = parse_url("wss://h:1234/p?q=1").unwrap();
/// assert_eq!(ep.scheme, Scheme::Https);
/// assert_eq!(ep.port, 1234);
/// assert_eq!(ep.resource, "/p?q=1");
/// assert!(ep.is_secure);
/// ```
pub fn parse_url(url: &str) -> Result<Endpoint, UrlError> {
    let (scheme, rest) = url
        .split_once(':')
        .ok_or_else(|| UrlError::Invalid(url.to_string()))?;

    let (scheme, is_secure) = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => (Scheme::Http, false),
        "https" | "wss" => (Scheme::Https, true),
        _ => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    };

    let rest = rest.strip_prefix("//").ok_or(UrlError::MissingHost)?;

    // Drop the fragment, then split the authority from path and query.
    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    // Userinfo is not used for authentication here.
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (host, port) = split_host_port(host_port)?;
    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }

    let (path, query) = match tail.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tail, None),
    };
    let mut resource = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        resource.push('?');
        resource.push_str(query);
    }

    Ok(Endpoint {
        scheme,
        host: host.to_ascii_lowercase(),
        port: port.unwrap_or_else(|| scheme.default_port()),
        resource,
        is_secure,
    })
}

/// Split `host[:port]`, accepting bracketed IPv6 literals.
fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>), UrlError> {
    let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or(UrlError::MissingHost)?;
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return Err(UrlError::Invalid(host_port.to_string())),
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    let port = match port {
        // An empty or zero port falls back to the scheme default.
        Some("") => None,
        Some(p) => match p.parse::<u16>() {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(_) => return Err(UrlError::InvalidPort(p.to_string())),
        },
        None => None,
    };
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(url: &str) -> (Scheme, String, u16, String, bool) {
        let ep = parse_url(url).unwrap();
        (ep.scheme, ep.host, ep.port, ep.resource, ep.is_secure)
    }

    #[test]
    fn ws_defaults_to_port_80() {
        assert_eq!(
            tuple("ws://h/r"),
            (Scheme::Http, "h".to_string(), 80, "/r".to_string(), false)
        );
    }

    #[test]
    fn wss_with_port_and_query() {
        assert_eq!(
            tuple("wss://h:1234/p?q=1"),
            (Scheme::Https, "h".to_string(), 1234, "/p?q=1".to_string(), true)
        );
    }

    #[test]
    fn http_without_path() {
        assert_eq!(
            tuple("http://h"),
            (Scheme::Http, "h".to_string(), 80, "/".to_string(), false)
        );
    }

    #[test]
    fn https_defaults_to_443() {
        assert_eq!(
            tuple("https://Example.COM/cockpit/socket"),
            (
                Scheme::Https,
                "example.com".to_string(),
                443,
                "/cockpit/socket".to_string(),
                true
            )
        );
    }

    #[test]
    fn query_without_path() {
        assert_eq!(parse_url("ws://h?x=1").unwrap().resource, "/?x=1");
    }

    #[test]
    fn fragment_and_userinfo_dropped() {
        let ep = parse_url("ws://user:pw@h:9090/socket#frag").unwrap();
        assert_eq!(ep.host, "h");
        assert_eq!(ep.port, 9090);
        assert_eq!(ep.resource, "/socket");
    }

    #[test]
    fn ipv6_literal() {
        let ep = parse_url("wss://[::1]:9090/").unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.port, 9090);
        assert_eq!(ep.host_header(), "[::1]:9090");
    }

    #[test]
    fn unknown_scheme_rejected() {
        assert_eq!(
            parse_url("ftp://h"),
            Err(UrlError::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn missing_host_rejected() {
        assert_eq!(parse_url("ws:///path"), Err(UrlError::MissingHost));
        assert_eq!(parse_url("http:h"), Err(UrlError::MissingHost));
    }

    #[test]
    fn missing_scheme_rejected() {
        assert!(matches!(parse_url("localhost"), Err(UrlError::Invalid(_))));
    }

    #[test]
    fn bad_port_rejected() {
        assert_eq!(
            parse_url("ws://h:abc/"),
            Err(UrlError::InvalidPort("abc".to_string()))
        );
    }

    #[test]
    fn origin_and_host_header() {
        let ep = parse_url("wss://h/socket").unwrap();
        assert_eq!(ep.host_header(), "h:443");
        assert_eq!(ep.origin(), "https://h:443");
    }
}
