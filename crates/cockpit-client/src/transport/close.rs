//! WebSocket close handshake and control-frame dispatch (RFC 6455 Section 5.5, 7).
//!
//! - [`parse_close_payload`]: Extract status code + reason from a close frame payload
//! - [`build_close_payload`]: Build a close frame payload from code + reason
//! - [`send_close`]: Send a masked close frame
//! - [`process_frame`]: Answer pings, echo closes and hand data frames back

use std::io::Write;

use super::frame::{write_frame, WsFrame, WsOpcode};
use super::TransportError;

/// Well-known WebSocket close status codes per RFC 6455 Section 7.4.1.
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;
    pub const PROTOCOL_ERROR: u16 = 1002;
    /// No status code present in the close frame.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;
    pub const INVALID_DATA: u16 = 1007;
    pub const TLS_HANDSHAKE: u16 = 1015;

    /// Codes reserved for local reporting; they never appear in a sent frame.
    pub fn is_reserved(code: u16) -> bool {
        matches!(code, Self::NO_STATUS | Self::ABNORMAL | Self::TLS_HANDSHAKE)
    }
}

/// Parse a close frame payload into (status_code, reason).
///
/// A payload shorter than two bytes carries no status code and yields
/// `(1005, "")`.
pub fn parse_close_payload(payload: &[u8]) -> (u16, String) {
    if payload.len() >= 2 {
        let code = u16::from_be_bytes([payload[0], payload[1]]);
        let reason = String::from_utf8_lossy(&payload[2..]).into_owned();
        (code, reason)
    } else {
        (WsCloseCode::NO_STATUS, String::new())
    }
}

/// Build a close frame payload, truncating the reason to fit the 125-byte
/// control frame limit.
pub fn build_close_payload(code: u16, reason: &str) -> Vec<u8> {
    let mut truncated_len = reason.len().min(123);
    while !reason.is_char_boundary(truncated_len) {
        truncated_len -= 1;
    }

    let mut payload = Vec::with_capacity(2 + truncated_len);
    payload.extend_from_slice(&code.to_be_bytes());
    payload.extend_from_slice(&reason.as_bytes()[..truncated_len]);
    payload
}

pub fn send_close<W: Write>(writer: &mut W, code: u16, reason: &str) -> Result<(), TransportError> {
    let payload = build_close_payload(code, reason);
    write_frame(writer, WsOpcode::Close, &payload, true)
}

/// Process one frame at the protocol level.
///
/// Returns:
/// - `Ok(Some(frame))` -- a data frame for the caller (text, binary, continuation)
/// - `Ok(None)` -- a control frame handled here (pong sent, pong ignored)
/// - `Err(Closed)` -- the peer closed; the close has been echoed
/// - `Err(Frame)` -- protocol violation; a close has been sent
pub fn process_frame<S: Write>(
    stream: &mut S,
    frame: WsFrame,
) -> Result<Option<WsFrame>, TransportError> {
    match frame.opcode {
        WsOpcode::Text if frame.fin && std::str::from_utf8(&frame.payload).is_err() => {
            send_close(stream, WsCloseCode::INVALID_DATA, "invalid UTF-8")?;
            Err(TransportError::Frame("invalid UTF-8 in text frame".to_string()))
        }
        WsOpcode::Text | WsOpcode::Binary | WsOpcode::Continuation => Ok(Some(frame)),
        WsOpcode::Close => {
            let (code, reason) = parse_close_payload(&frame.payload);
            let echo_code = if WsCloseCode::is_reserved(code) {
                WsCloseCode::NORMAL
            } else {
                code
            };
            send_close(stream, echo_code, "")?;
            Err(TransportError::Closed { code, reason })
        }
        WsOpcode::Ping => {
            write_frame(stream, WsOpcode::Pong, &frame.payload, true)?;
            Ok(None)
        }
        WsOpcode::Pong => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::frame::apply_mask;

    /// Decode a single masked client frame written into `buf`.
    fn unmask_client_frame(buf: &[u8]) -> (u8, Vec<u8>) {
        let len = (buf[1] & 0x7F) as usize;
        let key = [buf[2], buf[3], buf[4], buf[5]];
        let mut payload = buf[6..6 + len].to_vec();
        apply_mask(&mut payload, &key);
        (buf[0], payload)
    }

    #[test]
    fn test_parse_close_normal() {
        let (code, reason) = parse_close_payload(&[0x03, 0xE8, b'o', b'k']);
        assert_eq!(code, 1000);
        assert_eq!(reason, "ok");
    }

    #[test]
    fn test_parse_close_empty() {
        assert_eq!(parse_close_payload(&[]), (1005, String::new()));
    }

    #[test]
    fn test_build_close_truncates_reason() {
        let long = "x".repeat(200);
        let payload = build_close_payload(1000, &long);
        assert_eq!(payload.len(), 125);
    }

    #[test]
    fn test_build_close_respects_char_boundary() {
        let reason = "é".repeat(100);
        let payload = build_close_payload(1000, &reason);
        assert!(payload.len() <= 125);
        assert!(std::str::from_utf8(&payload[2..]).is_ok());
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let mut out = Vec::new();
        let frame = WsFrame {
            fin: true,
            opcode: WsOpcode::Ping,
            payload: b"beat".to_vec(),
        };
        assert!(process_frame(&mut out, frame).unwrap().is_none());
        let (byte0, payload) = unmask_client_frame(&out);
        assert_eq!(byte0, 0x8A);
        assert_eq!(payload, b"beat");
    }

    #[test]
    fn test_close_is_echoed() {
        let mut out = Vec::new();
        let frame = WsFrame {
            fin: true,
            opcode: WsOpcode::Close,
            payload: build_close_payload(1001, "bye"),
        };
        match process_frame(&mut out, frame) {
            Err(TransportError::Closed { code, reason }) => {
                assert_eq!(code, 1001);
                assert_eq!(reason, "bye");
            }
            other => panic!("expected Closed, got {other:?}"),
        }
        let (byte0, payload) = unmask_client_frame(&out);
        assert_eq!(byte0, 0x88);
        assert_eq!(&payload[..2], &1001u16.to_be_bytes());
    }

    #[test]
    fn test_reserved_close_codes_echo_normal() {
        for reserved in [1005u16, 1006, 1015] {
            let mut out = Vec::new();
            let frame = WsFrame {
                fin: true,
                opcode: WsOpcode::Close,
                payload: reserved.to_be_bytes().to_vec(),
            };
            match process_frame(&mut out, frame) {
                Err(TransportError::Closed { code, .. }) => assert_eq!(code, reserved),
                other => panic!("expected Closed, got {other:?}"),
            }
            let (_, payload) = unmask_client_frame(&out);
            assert_eq!(&payload[..2], &1000u16.to_be_bytes(), "echo of {reserved}");
        }
    }

    #[test]
    fn test_invalid_utf8_text_closes() {
        let mut out = Vec::new();
        let frame = WsFrame {
            fin: true,
            opcode: WsOpcode::Text,
            payload: vec![0xFF, 0xFE],
        };
        assert!(matches!(
            process_frame(&mut out, frame),
            Err(TransportError::Frame(_))
        ));
        let (_, payload) = unmask_client_frame(&out);
        assert_eq!(&payload[..2], &WsCloseCode::INVALID_DATA.to_be_bytes());
    }

    #[test]
    fn test_text_passes_through() {
        let mut out = Vec::new();
        let frame = WsFrame {
            fin: true,
            opcode: WsOpcode::Text,
            payload: b"1\n{}".to_vec(),
        };
        let frame = process_frame(&mut out, frame).unwrap().unwrap();
        assert_eq!(frame.payload, b"1\n{}");
        assert!(out.is_empty());
    }
}
