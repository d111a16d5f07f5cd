//! Blocking WebSocket client over TCP or TLS.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use cockpit_http::Endpoint;
use tracing::{debug, info};

use super::close::{process_frame, send_close, WsCloseCode};
use super::frame::{read_frame, write_frame, WsOpcode};
use super::handshake::perform_handshake;
use super::tls::{build_client_config, upgrade_to_tls, Stream};
use super::{RawStream, Transport, TransportError};

/// Connection options for [`WebSocket`].
#[derive(Debug, Clone)]
pub struct WebSocketOptions {
    /// Validate the server certificate chain on secure endpoints.
    pub verify_tls: bool,
    pub connect_timeout: Option<Duration>,
    /// Applies to both reads and writes once connected.
    pub read_timeout: Option<Duration>,
}

impl Default for WebSocketOptions {
    fn default() -> Self {
        WebSocketOptions {
            verify_tls: true,
            connect_timeout: None,
            read_timeout: None,
        }
    }
}

/// Buffered stream shared by the login exchange and the framed phase.
struct Connection {
    inner: BufReader<Stream>,
}

impl Connection {
    fn tcp(&self) -> &TcpStream {
        self.inner.get_ref().tcp()
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for Connection {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.get_mut().flush()
    }
}

/// The WebSocket [`Transport`].
///
/// `connect` opens the byte stream, `stream` exposes it for plain HTTP
/// exchanges, and `handshake` switches it to RFC 6455 framing.
pub struct WebSocket {
    options: WebSocketOptions,
    endpoint: Option<Endpoint>,
    conn: Option<Connection>,
    upgraded: bool,
}

impl WebSocket {
    pub fn new(options: WebSocketOptions) -> Self {
        WebSocket {
            options,
            endpoint: None,
            conn: None,
            upgraded: false,
        }
    }

    fn conn(&mut self) -> Result<&mut Connection, TransportError> {
        self.conn.as_mut().ok_or(TransportError::NotConnected)
    }

    fn framed(&mut self) -> Result<&mut Connection, TransportError> {
        if !self.upgraded {
            return Err(TransportError::NotConnected);
        }
        self.conn()
    }

    fn open_tcp(&self, endpoint: &Endpoint) -> Result<TcpStream, TransportError> {
        let addrs = (endpoint.host.as_str(), endpoint.port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.options.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(self.options.read_timeout)?;
                    stream.set_write_timeout(self.options.read_timeout)?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) => Err(TransportError::Io(e)),
            None => Err(TransportError::HostNotFound(endpoint.host.clone())),
        }
    }

    /// Drop the connection after the peer closed it or the framing broke.
    fn discard(&mut self) {
        self.conn = None;
        self.upgraded = false;
    }
}

impl Default for WebSocket {
    fn default() -> Self {
        WebSocket::new(WebSocketOptions::default())
    }
}

impl Transport for WebSocket {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.conn.is_some() {
            self.close()?;
        }
        let tcp = self.open_tcp(endpoint)?;
        let stream = if endpoint.is_secure {
            let config = build_client_config(self.options.verify_tls)?;
            upgrade_to_tls(tcp, &endpoint.host, config)?
        } else {
            Stream::Plain(tcp)
        };
        info!(host = %endpoint.host, port = endpoint.port, secure = endpoint.is_secure, "transport connected");
        self.conn = Some(Connection {
            inner: BufReader::new(stream),
        });
        self.endpoint = Some(endpoint.clone());
        self.upgraded = false;
        Ok(())
    }

    fn stream(&mut self) -> Result<&mut dyn RawStream, TransportError> {
        Ok(self.conn()? as &mut dyn RawStream)
    }

    fn handshake(&mut self, headers: &[(String, String)]) -> Result<(), TransportError> {
        let endpoint = self.endpoint.clone().ok_or(TransportError::NotConnected)?;
        let conn = self.conn()?;
        perform_handshake(conn, &endpoint, headers)?;
        self.upgraded = true;
        debug!(resource = %endpoint.resource, "websocket upgraded");
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let conn = self.framed()?;
        write_frame(conn, WsOpcode::Text, text.as_bytes(), true)
    }

    fn receive(&mut self) -> Result<String, TransportError> {
        let mut message: Option<Vec<u8>> = None;
        loop {
            let conn = self.framed()?;
            let frame = match read_frame(conn).and_then(|frame| process_frame(conn, frame)) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    if matches!(e, TransportError::Closed { .. } | TransportError::Frame(_)) {
                        self.discard();
                    }
                    return Err(e);
                }
            };

            match (frame.opcode, message.as_mut()) {
                (WsOpcode::Text | WsOpcode::Binary, None) if frame.fin => {
                    return into_text(self, frame.payload);
                }
                (WsOpcode::Text | WsOpcode::Binary, None) => message = Some(frame.payload),
                (WsOpcode::Continuation, Some(buf)) => {
                    buf.extend_from_slice(&frame.payload);
                    if frame.fin {
                        let payload = std::mem::take(buf);
                        return into_text(self, payload);
                    }
                }
                (WsOpcode::Continuation, None) => {
                    return Err(protocol_violation(self, "continuation without a message"));
                }
                (WsOpcode::Text | WsOpcode::Binary, Some(_)) => {
                    return Err(protocol_violation(self, "new message before the previous one ended"));
                }
                // Control frames are consumed by `process_frame`.
                (WsOpcode::Close | WsOpcode::Ping | WsOpcode::Pong, _) => continue,
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let upgraded = self.upgraded;
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        self.upgraded = false;
        let result = if upgraded {
            send_close(&mut conn, WsCloseCode::NORMAL, "")
        } else {
            Ok(())
        };
        match conn.tcp().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => debug!(error = %e, "shutdown failed"),
            _ => {}
        }
        info!("transport closed");
        result
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

fn into_text(ws: &mut WebSocket, payload: Vec<u8>) -> Result<String, TransportError> {
    String::from_utf8(payload).map_err(|_| {
        if let Some(conn) = ws.conn.as_mut() {
            let _ = send_close(conn, WsCloseCode::INVALID_DATA, "invalid UTF-8");
        }
        ws.discard();
        TransportError::Frame("invalid UTF-8 in message".to_string())
    })
}

fn protocol_violation(ws: &mut WebSocket, what: &str) -> TransportError {
    if let Some(conn) = ws.conn.as_mut() {
        let _ = send_close(conn, WsCloseCode::PROTOCOL_ERROR, what);
    }
    ws.discard();
    TransportError::Frame(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_verify() {
        let options = WebSocketOptions::default();
        assert!(options.verify_tls);
        assert!(options.connect_timeout.is_none());
    }

    #[test]
    fn test_unconnected_operations() {
        let mut ws = WebSocket::default();
        assert!(!ws.is_connected());
        assert!(matches!(ws.send("x"), Err(TransportError::NotConnected)));
        assert!(matches!(ws.receive(), Err(TransportError::NotConnected)));
        assert!(matches!(ws.handshake(&[]), Err(TransportError::NotConnected)));
        assert!(ws.stream().is_err());
        assert!(ws.close().is_ok());
    }

    #[test]
    fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = cockpit_http::parse_url(&format!("ws://127.0.0.1:{port}/")).unwrap();
        let mut ws = WebSocket::default();
        assert!(matches!(ws.connect(&endpoint), Err(TransportError::Io(_))));
        assert!(!ws.is_connected());
    }
}
