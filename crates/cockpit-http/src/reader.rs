//! HTTP message reader.
//!
//! Parses one message from a buffered byte stream. The stream is never read
//! past the end of the message when its length is known (`Content-Length` or
//! chunked), so the same connection can carry a WebSocket upgrade afterwards.
//!
//! - [`receive`]: Read a complete message
//! - [`read_head`]: Read only the initial line and headers
//! - [`read_body`]: Read a body framed according to already-parsed headers

use std::io::{self, BufRead, Read};

use crate::error::HttpError;
use crate::message::{
    Headers, HttpMessage, HttpVersion, InitLine, HEADER_CONTENT_LENGTH,
};

/// Block size for bodies delimited by end of stream.
pub const BLOCK_SIZE: usize = 1024;

/// Read a complete HTTP message.
pub fn receive<R: BufRead + ?Sized>(reader: &mut R) -> Result<HttpMessage, HttpError> {
    let (init_line, headers) = read_head(reader)?;
    let body = read_body(reader, &headers)?;
    Ok(HttpMessage::new(init_line, headers, body))
}

/// Read the initial line and the header block, leaving the body unread.
pub fn read_head<R: BufRead + ?Sized>(reader: &mut R) -> Result<(InitLine, Headers), HttpError> {
    let line = read_line(reader)?.ok_or(HttpError::UnexpectedEof("initial line"))?;
    let init_line = parse_init_line(&line)?;
    let headers = read_headers(reader)?;
    Ok((init_line, headers))
}

/// Classify and parse an initial line (without its CRLF).
///
/// Lines starting with `HTTP` are status lines; anything else must be a
/// three-token request line.
pub fn parse_init_line(line: &str) -> Result<InitLine, HttpError> {
    if line.starts_with("HTTP") {
        let mut parts = line.splitn(3, ' ');
        let version: HttpVersion = parts.next().unwrap_or_default().parse()?;
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| HttpError::MalformedInitLine(line.to_string()))?;
        let reason = match (version, parts.next()) {
            (HttpVersion::Http10 | HttpVersion::Http11, Some(reason)) => reason.to_string(),
            _ => String::new(),
        };
        return Ok(InitLine::Response {
            version,
            status,
            reason,
        });
    }

    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [method, target, version] if !method.is_empty() && !target.is_empty() => {
            Ok(InitLine::Request {
                method: method.to_string(),
                target: target.to_string(),
                version: version.parse()?,
            })
        }
        _ => Err(HttpError::MalformedInitLine(line.to_string())),
    }
}

/// Read header lines up to and including the blank terminator line.
pub fn read_headers<R: BufRead + ?Sized>(reader: &mut R) -> Result<Headers, HttpError> {
    let mut headers = Headers::new();
    loop {
        let line = read_line(reader)?.ok_or(HttpError::UnexpectedEof("headers"))?;
        if line.is_empty() {
            return Ok(headers);
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::MalformedHeader(line.clone()))?;
        headers.set(name, value.trim_start());
    }
}

/// Read a body framed by `headers`.
///
/// Precedence: a nonzero `Content-Length`, then chunked transfer coding, then
/// everything up to end of stream. A zero `Content-Length` on a non-chunked
/// message is an empty body.
pub fn read_body<R: BufRead + ?Sized>(reader: &mut R, headers: &Headers) -> Result<Vec<u8>, HttpError> {
    if let Some(raw) = headers.get_ignore_case(HEADER_CONTENT_LENGTH) {
        let len: usize = raw
            .trim()
            .parse()
            .map_err(|_| HttpError::InvalidContentLength(raw.to_string()))?;
        if len > 0 {
            return read_exact_len(reader, len, "body");
        }
        if !headers.is_chunked() {
            return Ok(Vec::new());
        }
    }

    if headers.is_chunked() {
        return read_chunked_body(reader);
    }

    read_to_eof(reader)
}

/// Decode a chunked body, concatenating all chunks.
pub fn read_chunked_body<R: BufRead + ?Sized>(reader: &mut R) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    loop {
        let line = read_line(reader)?.ok_or(HttpError::UnexpectedEof("chunk size"))?;
        // Chunk extensions (";name=value") are ignored.
        let size_str = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| HttpError::MalformedChunkSize(line.clone()))?;

        if size == 0 {
            // Trailer section; a peer that closes right after the last chunk is tolerated.
            while let Some(trailer) = read_line(reader)? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        if body.len().checked_add(size).is_none() {
            return Err(HttpError::MalformedChunkSize(line));
        }
        body.extend(read_exact_len(reader, size, "chunk")?);

        let mut crlf = [0u8; 2];
        fill(reader, &mut crlf, "chunk terminator")?;
        if &crlf != b"\r\n" {
            return Err(HttpError::MalformedChunkSize(format!(
                "missing CRLF after {size}-byte chunk"
            )));
        }
    }
}

/// Read fixed-size blocks until a short block signals end of stream.
fn read_to_eof<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    loop {
        let n = Read::take(&mut *reader, BLOCK_SIZE as u64).read_to_end(&mut body)?;
        if n < BLOCK_SIZE {
            return Ok(body);
        }
    }
}

/// Read exactly `len` bytes, growing the buffer only as data arrives.
fn read_exact_len<R: Read + ?Sized>(reader: &mut R, len: usize, what: &'static str) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    Read::take(&mut *reader, len as u64).read_to_end(&mut body)?;
    if body.len() < len {
        return Err(HttpError::UnexpectedEof(what));
    }
    Ok(body)
}

fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), HttpError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => HttpError::UnexpectedEof(what),
        _ => HttpError::Io(e),
    })
}

/// Read one line, stripping trailing CR/LF. `None` at end of stream.
fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Option<String>, HttpError> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\r' | b'\n')) {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| HttpError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(raw: &str) -> Result<HttpMessage, HttpError> {
        receive(&mut Cursor::new(raw.as_bytes().to_vec()))
    }

    #[test]
    fn response_with_content_length() {
        let msg = parse(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nSet-Cookie: cockpit=abc\r\n\r\nhelloEXTRA",
        )
        .unwrap();
        assert_eq!(msg.status(), Some(200));
        assert_eq!(msg.reason(), Some("OK"));
        assert_eq!(msg.body, b"hello");
        assert_eq!(msg.header("set-cookie"), Some("cockpit=abc"));
    }

    #[test]
    fn content_length_leaves_rest_of_stream() {
        let mut cursor = Cursor::new(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokNEXT".to_vec());
        receive(&mut cursor).unwrap();
        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "NEXT");
    }

    #[test]
    fn reason_phrase_may_contain_spaces() {
        let msg = parse("HTTP/1.1 401 Authentication failed\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(msg.reason(), Some("Authentication failed"));
    }

    #[test]
    fn reason_phrase_is_optional() {
        let msg = parse("HTTP/1.1 204\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(msg.status(), Some(204));
        assert_eq!(msg.reason(), Some(""));
    }

    #[test]
    fn request_line() {
        let msg = parse("GET /login HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(
            msg.init_line,
            InitLine::Request {
                method: "GET".to_string(),
                target: "/login".to_string(),
                version: HttpVersion::Http11,
            }
        );
        assert_eq!(msg.headers.get("Host"), Some("example.com"));
        assert!(msg.body.is_empty());
    }

    #[test]
    fn request_line_wrong_token_count() {
        let err = parse("GET /login\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedInitLine(_)), "{err:?}");

        let err = parse("GET /a b HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedInitLine(_)), "{err:?}");
    }

    #[test]
    fn status_line_without_code() {
        let err = parse("HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedInitLine(_)), "{err:?}");

        let err = parse("HTTP/1.1 abc OK\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedInitLine(_)), "{err:?}");
    }

    #[test]
    fn empty_stream() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, HttpError::UnexpectedEof("initial line")), "{err:?}");
    }

    #[test]
    fn header_value_left_trimmed_only() {
        let msg = parse("HTTP/1.1 200 OK\r\nX-Test:   padded  \r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(msg.headers.get("X-Test"), Some("padded  "));
    }

    #[test]
    fn header_value_split_on_first_colon() {
        let msg = parse("HTTP/1.1 200 OK\r\nLocation: http://h:80/x\r\nContent-Length: 0\r\n\r\n")
            .unwrap();
        assert_eq!(msg.headers.get("Location"), Some("http://h:80/x"));
    }

    #[test]
    fn header_without_colon() {
        let err = parse("HTTP/1.1 200 OK\r\nbogus\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedHeader(_)), "{err:?}");
    }

    #[test]
    fn truncated_content_length_body() {
        let err = parse("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort").unwrap_err();
        assert!(matches!(err, HttpError::UnexpectedEof("body")), "{err:?}");
    }

    #[test]
    fn invalid_content_length() {
        let err = parse("HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpError::InvalidContentLength(_)), "{err:?}");
    }

    #[test]
    fn chunked_body() {
        let msg = parse(
            "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n7;ext=1\r\n, world\r\n0\r\n\r\n",
        )
        .unwrap();
        assert_eq!(msg.body, b"hello, world");
    }

    #[test]
    fn chunked_body_truncated() {
        let err = parse("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\na\r\nhello").unwrap_err();
        assert!(matches!(err, HttpError::UnexpectedEof("chunk")), "{err:?}");
    }

    #[test]
    fn chunked_body_bad_size() {
        let err = parse("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n").unwrap_err();
        assert!(matches!(err, HttpError::MalformedChunkSize(_)), "{err:?}");
    }

    #[test]
    fn huge_content_length_with_short_body() {
        let err = parse("HTTP/1.1 200 OK\r\nContent-Length: 18446744073709551615\r\n\r\nabc").unwrap_err();
        assert!(
            matches!(err, HttpError::UnexpectedEof("body") | HttpError::InvalidContentLength(_)),
            "{err:?}"
        );
    }

    #[test]
    fn chunk_size_overflowing_body_length() {
        let err = parse(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\nffffffffffffffff\r\nb\r\n0\r\n\r\n",
        )
        .unwrap_err();
        assert!(matches!(err, HttpError::MalformedChunkSize(_)), "{err:?}");
    }

    #[test]
    fn huge_first_chunk_with_short_data() {
        let err = parse("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nfffffffffffff\r\nab").unwrap_err();
        assert!(matches!(err, HttpError::UnexpectedEof("chunk")), "{err:?}");
    }

    #[test]
    fn content_length_takes_precedence_over_chunked() {
        let msg = parse(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\nabc",
        )
        .unwrap();
        assert_eq!(msg.body, b"abc");
    }

    #[test]
    fn eof_delimited_body_keeps_tail() {
        let body = "y".repeat(BLOCK_SIZE * 2 + 17);
        let msg = parse(&format!("HTTP/1.0 200 OK\r\n\r\n{body}")).unwrap();
        assert_eq!(msg.body.len(), BLOCK_SIZE * 2 + 17);
    }

    #[test]
    fn eof_delimited_body_exact_block_multiple() {
        let body = "z".repeat(BLOCK_SIZE);
        let msg = parse(&format!("HTTP/1.0 200 OK\r\n\r\n{body}")).unwrap();
        assert_eq!(msg.body.len(), BLOCK_SIZE);
    }

    #[test]
    fn read_head_stops_before_body() {
        let mut cursor = Cursor::new(
            b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n\x81\x00".to_vec(),
        );
        let (line, headers) = read_head(&mut cursor).unwrap();
        assert!(matches!(line, InitLine::Response { status: 101, .. }));
        assert_eq!(headers.get("Upgrade"), Some("websocket"));
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, vec![0x81, 0x00]);
    }

    #[test]
    fn http09_status_line_has_no_reason() {
        let line = parse_init_line("HTTP/0.9 200 OK").unwrap();
        assert_eq!(
            line,
            InitLine::Response {
                version: HttpVersion::Http09,
                status: 200,
                reason: String::new(),
            }
        );
    }
}
