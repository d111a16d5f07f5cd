//! WebSocket frame codec, client side (RFC 6455 Section 5.2-5.3).
//!
//! - [`read_frame`]: Parse a single frame from a byte stream
//! - [`write_frame`]: Write a frame, masked with a fresh random key
//! - [`apply_mask`]: Symmetric XOR masking per RFC 6455 Section 5.3

use std::io::{Read, Write};

use rand::Rng;

use super::TransportError;

/// Maximum accepted payload size (64 MiB); larger lengths are rejected before allocation.
const MAX_PAYLOAD_SIZE: u64 = 64 * 1024 * 1024;

/// WebSocket frame opcodes per RFC 6455 Section 5.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsOpcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl WsOpcode {
    pub fn from_u8(byte: u8) -> Result<WsOpcode, TransportError> {
        match byte {
            0x0 => Ok(WsOpcode::Continuation),
            0x1 => Ok(WsOpcode::Text),
            0x2 => Ok(WsOpcode::Binary),
            0x8 => Ok(WsOpcode::Close),
            0x9 => Ok(WsOpcode::Ping),
            0xA => Ok(WsOpcode::Pong),
            _ => Err(TransportError::Frame(format!("unknown opcode: 0x{:X}", byte))),
        }
    }

    pub fn is_control(self) -> bool {
        (self as u8) & 0x8 != 0
    }
}

/// A parsed WebSocket frame.
#[derive(Debug)]
pub struct WsFrame {
    /// FIN bit -- `true` if this is the final fragment of a message.
    pub fin: bool,
    pub opcode: WsOpcode,
    pub payload: Vec<u8>,
}

/// Apply or remove the 4-byte XOR mask on a payload.
pub fn apply_mask(payload: &mut [u8], mask_key: &[u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask_key[i % 4];
    }
}

/// Parse one frame sent by the server.
///
/// Servers must not mask their frames (RFC 6455 Section 5.1); a masked frame
/// is a protocol error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<WsFrame, TransportError> {
    // Byte 0: FIN(1) RSV(3) Opcode(4)
    // Byte 1: MASK(1) Payload-Length(7)
    let mut header = [0u8; 2];
    reader.read_exact(&mut header)?;

    let fin = (header[0] & 0x80) != 0;
    let rsv = (header[0] >> 4) & 0x07;
    if rsv != 0 {
        return Err(TransportError::Frame(
            "non-zero RSV bits without negotiated extensions".to_string(),
        ));
    }
    let opcode = WsOpcode::from_u8(header[0] & 0x0F)?;

    if (header[1] & 0x80) != 0 {
        return Err(TransportError::Frame("masked frame from server".to_string()));
    }

    let payload_len: u64 = match header[1] & 0x7F {
        len @ 0..=125 => len as u64,
        126 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            u16::from_be_bytes(buf) as u64
        }
        _ => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            let len = u64::from_be_bytes(buf);
            if len >> 63 != 0 {
                return Err(TransportError::Frame(
                    "MSB of 64-bit length must be 0".to_string(),
                ));
            }
            len
        }
    };

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(TransportError::Frame(format!(
            "payload length {} exceeds maximum {}",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    if opcode.is_control() && (payload_len > 125 || !fin) {
        return Err(TransportError::Frame(
            "control frames must be final and at most 125 bytes".to_string(),
        ));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    Ok(WsFrame {
        fin,
        opcode,
        payload,
    })
}

/// Write one client frame, masked with a random key (RFC 6455 Section 5.3).
pub fn write_frame<W: Write>(
    writer: &mut W,
    opcode: WsOpcode,
    payload: &[u8],
    fin: bool,
) -> Result<(), TransportError> {
    let mask_key: [u8; 4] = rand::rng().random();
    write_frame_with_mask(writer, opcode, payload, fin, Some(mask_key))
}

/// Write one frame with an explicit mask, or unmasked when `mask_key` is `None`.
pub fn write_frame_with_mask<W: Write>(
    writer: &mut W,
    opcode: WsOpcode,
    payload: &[u8],
    fin: bool,
    mask_key: Option<[u8; 4]>,
) -> Result<(), TransportError> {
    let byte0 = if fin { 0x80 } else { 0x00 } | (opcode as u8);
    let mask_bit = if mask_key.is_some() { 0x80 } else { 0x00 };

    let len = payload.len();
    let mut buf = Vec::with_capacity(len + 14);
    buf.push(byte0);
    if len <= 125 {
        buf.push(mask_bit | len as u8);
    } else if len <= 65535 {
        buf.push(mask_bit | 126);
        buf.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        buf.push(mask_bit | 127);
        buf.extend_from_slice(&(len as u64).to_be_bytes());
    }

    let body_start = buf.len() + mask_key.map_or(0, |k| k.len());
    if let Some(key) = mask_key {
        buf.extend_from_slice(&key);
    }
    buf.extend_from_slice(payload);
    if let Some(key) = mask_key {
        apply_mask(&mut buf[body_start..], &key);
    }

    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}
