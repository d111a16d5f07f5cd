//! HTTP message writer.
//!
//! - [`send`]: Write a complete message (initial line, headers, body)
//! - [`write_chunked_body`]: Chunked transfer coding with [`CHUNK_MAX`]-sized chunks

use std::io::Write;

use crate::error::HttpError;
use crate::message::HttpMessage;

/// Largest chunk emitted by [`write_chunked_body`]. RFC 7230 sets no limit.
pub const CHUNK_MAX: usize = 4 * 1024;

const CRLF: &[u8] = b"\r\n";

/// Write `message` to `writer` and flush.
///
/// For HTTP/0.9 the header block and its blank-line terminator are skipped.
/// The body is chunk-encoded only when the message is marked chunked and the
/// version is HTTP/1.1; otherwise it is written verbatim.
pub fn send<W: Write + ?Sized>(message: &HttpMessage, writer: &mut W) -> Result<(), HttpError> {
    write!(writer, "{}", message.init_line)?;
    writer.write_all(CRLF)?;

    let version = message.version();
    if version.has_headers() {
        for (name, value) in message.headers.iter() {
            write!(writer, "{name}: {value}")?;
            writer.write_all(CRLF)?;
        }
        writer.write_all(CRLF)?;
    }

    if message.is_chunked() && version.supports_chunked() {
        write_chunked_body(writer, &message.body)?;
    } else {
        writer.write_all(&message.body)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `body` as a sequence of chunks followed by the zero-length chunk.
pub fn write_chunked_body<W: Write + ?Sized>(writer: &mut W, body: &[u8]) -> Result<(), HttpError> {
    for chunk in body.chunks(CHUNK_MAX) {
        write_chunk(writer, chunk)?;
    }
    write_chunk(writer, &[])
}

fn write_chunk<W: Write + ?Sized>(writer: &mut W, chunk: &[u8]) -> Result<(), HttpError> {
    write!(writer, "{:x}", chunk.len())?;
    writer.write_all(CRLF)?;
    writer.write_all(chunk)?;
    writer.write_all(CRLF)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HttpMessage, HttpVersion};

    fn render(message: &HttpMessage) -> String {
        let mut buf = Vec::new();
        send(message, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn request_with_headers() {
        let msg = HttpMessage::request("GET", "/login", HttpVersion::Http11)
            .with_header("Host", "localhost:9090")
            .with_header("Connection", "keep-alive");
        assert_eq!(
            render(&msg),
            "GET /login HTTP/1.1\r\nHost: localhost:9090\r\nConnection: keep-alive\r\n\r\n"
        );
    }

    #[test]
    fn http09_omits_headers() {
        let msg = HttpMessage::response(HttpVersion::Http09, 200, "")
            .with_header("Content-Type", "text/plain")
            .with_body("hello");
        assert_eq!(render(&msg), "HTTP/0.9 200\r\nhello");
    }

    #[test]
    fn chunked_body_is_encoded() {
        let msg = HttpMessage::response(HttpVersion::Http11, 200, "OK")
            .with_header("Transfer-Encoding", "chunked")
            .with_body("hello");
        insta::assert_snapshot!(
            render(&msg).escape_debug().to_string(),
            @r#"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"#
        );
    }

    #[test]
    fn chunked_ignored_for_http10() {
        let msg = HttpMessage::response(HttpVersion::Http10, 200, "OK")
            .with_header("Transfer-Encoding", "chunked")
            .with_body("hello");
        assert!(render(&msg).ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn chunks_are_bounded() {
        let body = vec![b'x'; CHUNK_MAX + 1];
        let mut buf = Vec::new();
        write_chunked_body(&mut buf, &body).unwrap();

        let expected_len = 6 + CHUNK_MAX + 2 + 3 + 1 + 2 + 5;
        assert_eq!(buf.len(), expected_len);
        assert!(buf.starts_with(b"1000\r\n"));
        assert!(buf.ends_with(b"\r\n1\r\nx\r\n0\r\n\r\n"));
    }

    #[test]
    fn empty_chunked_body_is_terminator_only() {
        let mut buf = Vec::new();
        write_chunked_body(&mut buf, &[]).unwrap();
        assert_eq!(buf, b"0\r\n\r\n");
    }
}
