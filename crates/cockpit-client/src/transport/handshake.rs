//! WebSocket client handshake (RFC 6455 Section 4.1).
//!
//! Sends the HTTP upgrade request with a random `Sec-WebSocket-Key` and checks
//! the server's `101 Switching Protocols` answer, including the
//! `Sec-WebSocket-Accept` value.
//!
//! - [`perform_handshake`]: Main entry point -- writes the request, validates the response
//! - [`compute_accept_key`]: SHA-1 + Base64 computation per RFC 6455 Section 4.2.2
//! - [`validate_upgrade_response`]: Header validation against RFC requirements

use std::io::{BufRead, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cockpit_http::{Endpoint, Headers, HttpMessage, HttpVersion, InitLine};
use rand::Rng;
use sha1::{Digest, Sha1};

use super::TransportError;

/// RFC 6455 magic GUID concatenated with the client key for Sec-WebSocket-Accept.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` value for `client_key`.
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// A fresh `Sec-WebSocket-Key`: 16 random bytes, Base64 encoded.
pub fn generate_key() -> String {
    let nonce: [u8; 16] = rand::rng().random();
    BASE64.encode(nonce)
}

/// Build the upgrade request for `endpoint`. `extra` headers are appended
/// after the standard ones.
pub fn build_upgrade_request(
    endpoint: &Endpoint,
    client_key: &str,
    extra: &[(String, String)],
) -> HttpMessage {
    let mut request = HttpMessage::request("GET", &endpoint.resource, HttpVersion::Http11)
        .with_header("Host", &endpoint.host_header())
        .with_header("Upgrade", "websocket")
        .with_header("Connection", "Upgrade")
        .with_header("Sec-WebSocket-Key", client_key)
        .with_header("Sec-WebSocket-Version", "13")
        .with_header("Origin", &endpoint.origin());
    for (name, value) in extra {
        request.set_header(name.as_str(), value.as_str());
    }
    request
}

/// Validate the server's answer to the upgrade request.
pub fn validate_upgrade_response(
    init_line: &InitLine,
    headers: &Headers,
    client_key: &str,
) -> Result<(), TransportError> {
    match init_line {
        InitLine::Response { status: 101, .. } => {}
        InitLine::Response { status, reason, .. } => {
            return Err(TransportError::Handshake(format!(
                "expected 101 Switching Protocols, got {status} {reason}"
            )))
        }
        InitLine::Request { .. } => {
            return Err(TransportError::Handshake(
                "expected a response, got a request line".to_string(),
            ))
        }
    }

    match headers.get_ignore_case("Upgrade") {
        Some(v) if v.to_ascii_lowercase().contains("websocket") => {}
        _ => {
            return Err(TransportError::Handshake(
                "missing or invalid Upgrade header".to_string(),
            ))
        }
    }

    match headers.get_ignore_case("Connection") {
        Some(v) if v.to_ascii_lowercase().contains("upgrade") => {}
        _ => {
            return Err(TransportError::Handshake(
                "missing or invalid Connection header".to_string(),
            ))
        }
    }

    let expected = compute_accept_key(client_key);
    match headers.get_ignore_case("Sec-WebSocket-Accept") {
        Some(accept) if accept.trim() == expected => Ok(()),
        Some(_) => Err(TransportError::Handshake(
            "Sec-WebSocket-Accept does not match the request key".to_string(),
        )),
        None => Err(TransportError::Handshake(
            "missing Sec-WebSocket-Accept header".to_string(),
        )),
    }
}

/// Perform the upgrade on an already connected stream.
///
/// Only the response head is consumed; the stream is positioned at the first
/// WebSocket frame afterwards.
pub fn perform_handshake<S: BufRead + Write + ?Sized>(
    stream: &mut S,
    endpoint: &Endpoint,
    extra: &[(String, String)],
) -> Result<(), TransportError> {
    let client_key = generate_key();
    let request = build_upgrade_request(endpoint, &client_key, extra);

    cockpit_http::send(&request, stream)
        .map_err(|e| TransportError::Handshake(format!("write upgrade request: {e}")))?;

    let (init_line, headers) = cockpit_http::read_head(stream)
        .map_err(|e| TransportError::Handshake(format!("read upgrade response: {e}")))?;

    validate_upgrade_response(&init_line, &headers, &client_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    struct TestStream {
        read_buf: BufReader<Cursor<Vec<u8>>>,
        write_buf: Vec<u8>,
    }

    impl Read for TestStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.read_buf.read(buf)
        }
    }

    impl BufRead for TestStream {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            self.read_buf.fill_buf()
        }
        fn consume(&mut self, amt: usize) {
            self.read_buf.consume(amt)
        }
    }

    impl Write for TestStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.write_buf.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn endpoint() -> Endpoint {
        cockpit_http::parse_url("ws://localhost:9090/cockpit/socket").unwrap()
    }

    fn response_headers(accept: &str) -> Headers {
        [
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Accept", accept),
        ]
        .into_iter()
        .collect()
    }

    fn switching() -> InitLine {
        InitLine::Response {
            version: HttpVersion::Http11,
            status: 101,
            reason: "Switching Protocols".to_string(),
        }
    }

    #[test]
    fn test_accept_key_rfc_example() {
        let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_generated_key_is_16_bytes() {
        let key = generate_key();
        assert_eq!(BASE64.decode(&key).unwrap().len(), 16);
        assert_ne!(key, generate_key());
    }

    #[test]
    fn test_upgrade_request_headers() {
        let cookie = vec![("Cookie".to_string(), "cockpit=abc".to_string())];
        let request = build_upgrade_request(&endpoint(), "a2V5", &cookie);

        assert_eq!(request.init_line.to_string(), "GET /cockpit/socket HTTP/1.1");
        assert_eq!(request.header("Host"), Some("localhost:9090"));
        assert_eq!(request.header("Origin"), Some("http://localhost:9090"));
        assert_eq!(request.header("Sec-WebSocket-Key"), Some("a2V5"));
        assert_eq!(request.header("Cookie"), Some("cockpit=abc"));
    }

    #[test]
    fn test_validate_valid_response() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let headers = response_headers("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert!(validate_upgrade_response(&switching(), &headers, key).is_ok());
    }

    #[test]
    fn test_validate_wrong_accept() {
        let headers = response_headers("bogus");
        let err = validate_upgrade_response(&switching(), &headers, "dGhlIHNhbXBsZSBub25jZQ==")
            .unwrap_err();
        assert!(err.to_string().contains("Sec-WebSocket-Accept"), "got: {err}");
    }

    #[test]
    fn test_validate_wrong_status() {
        let line = InitLine::Response {
            version: HttpVersion::Http11,
            status: 403,
            reason: "Forbidden".to_string(),
        };
        let err = validate_upgrade_response(&line, &Headers::new(), "k").unwrap_err();
        assert!(err.to_string().contains("403"), "got: {err}");
    }

    #[test]
    fn test_validate_missing_upgrade_header() {
        let headers: Headers = [("Connection", "Upgrade")].into_iter().collect();
        let err = validate_upgrade_response(&switching(), &headers, "k").unwrap_err();
        assert!(err.to_string().contains("Upgrade"), "got: {err}");
    }

    #[test]
    fn test_perform_handshake_rejects_non_101() {
        let mut stream = TestStream {
            read_buf: BufReader::new(Cursor::new(
                b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n".to_vec(),
            )),
            write_buf: Vec::new(),
        };
        let err = perform_handshake(&mut stream, &endpoint(), &[]).unwrap_err();
        assert!(matches!(err, TransportError::Handshake(_)));

        let request = String::from_utf8_lossy(&stream.write_buf);
        assert!(request.starts_with("GET /cockpit/socket HTTP/1.1\r\n"));
        assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
    }
}
