//! Wire frame encoding and decoding (RFC 6455 Section 5).
//!
//! `Frame::parse` never assumes the buffer holds exactly one complete frame:
//! it reports how many bytes it consumed, or `Error::IncompleteFrame` when
//! more transport bytes are needed. The byte stream may split a frame at any
//! offset; the caller retains unconsumed bytes and retries.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                    Masking key (if MASK set)                  |
//! +---------------------------------------------------------------+
//! |                         Payload data                          |
//! +---------------------------------------------------------------+
//! ```

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames (RFC 6455 Section 5.5).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

struct FrameHeader {
    fin: bool,
    opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload_len: usize,
    header_len: usize,
}

/// Decode the frame header, reporting how many further bytes are needed when
/// the buffer cuts off mid-header.
fn parse_header(buf: &[u8]) -> Result<FrameHeader> {
    if buf.len() < 2 {
        return Err(Error::IncompleteFrame {
            needed: 2 - buf.len(),
        });
    }

    let byte0 = buf[0];
    let byte1 = buf[1];

    let fin = (byte0 & 0x80) != 0;
    // RSV bits must be zero: no extension is ever negotiated here.
    if byte0 & 0x70 != 0 {
        return Err(Error::ReservedBitsSet);
    }
    let opcode = OpCode::from_u8(byte0 & 0x0F)?;

    let masked = (byte1 & 0x80) != 0;
    let len_selector = byte1 & 0x7F;

    // Three-tier length encoding: 0-125 literal, 126 -> 16-bit big-endian,
    // 127 -> 64-bit big-endian.
    let (payload_len, len_end) = match len_selector {
        0..=125 => (u64::from(len_selector), 2),
        126 => {
            if buf.len() < 4 {
                return Err(Error::IncompleteFrame {
                    needed: 4 - buf.len(),
                });
            }
            (u64::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
        }
        _ => {
            if buf.len() < 10 {
                return Err(Error::IncompleteFrame {
                    needed: 10 - buf.len(),
                });
            }
            let len = u64::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
            ]);
            (len, 10)
        }
    };

    let payload_len =
        usize::try_from(payload_len).map_err(|_| Error::PayloadTooLarge { size: payload_len })?;

    let header_len = if masked { len_end + 4 } else { len_end };
    if buf.len() < header_len {
        return Err(Error::IncompleteFrame {
            needed: header_len - buf.len(),
        });
    }

    let mask = if masked {
        Some([buf[len_end], buf[len_end + 1], buf[len_end + 2], buf[len_end + 3]])
    } else {
        None
    };

    Ok(FrameHeader {
        fin,
        opcode,
        mask,
        payload_len,
        header_len,
    })
}

/// One wire-level frame.
///
/// Produced ephemerally by decoding; its payload buffer is moved, not copied,
/// into the message assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Whether the frame arrived masked. Always false for frames built
    /// locally; decoding unmasks the payload before storing it.
    pub masked: bool,
    /// Payload bytes, unmasked.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a frame for sending.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            opcode,
            masked: false,
            payload,
        }
    }

    /// Single unfragmented text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Single unfragmented binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = code.to_be_bytes().to_vec();
                data.extend_from_slice(reason.as_bytes());
                data
            }
            None => Vec::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed. Masked payloads
    /// are unmasked in place during the copy out of the buffer.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` when `buf` cuts off mid-frame
    /// - `Error::ReservedOpcode` / `Error::ReservedBitsSet` for malformed
    ///   headers
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = parse_header(buf)?;

        let total = header
            .header_len
            .checked_add(header.payload_len)
            .ok_or(Error::PayloadTooLarge {
                size: header.payload_len as u64,
            })?;
        if buf.len() < total {
            return Err(Error::IncompleteFrame {
                needed: total - buf.len(),
            });
        }

        let mut payload = buf[header.header_len..total].to_vec();
        if let Some(mask) = header.mask {
            apply_mask(&mut payload, mask);
        }

        let frame = Frame {
            fin: header.fin,
            opcode: header.opcode,
            masked: header.mask.is_some(),
            payload,
        };
        Ok((frame, total))
    }

    /// Validate control-frame constraints (RFC 6455 Section 5.5): control
    /// frames must not be fragmented and carry at most 125 payload bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::FragmentedControlFrame` or
    /// `Error::ControlFrameTooLarge` accordingly.
    pub fn validate(&self) -> Result<()> {
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }
        Ok(())
    }

    /// Encode this frame onto the end of `buf`.
    ///
    /// `mask` is `None` for server-built frames; tests pass a key to produce
    /// client-style frames. The length tier mirrors `parse` exactly, and the
    /// 64-bit tier always emits the full 8-byte big-endian length.
    pub fn encode_into(&self, buf: &mut Vec<u8>, mask: Option<[u8; 4]>) {
        let payload_len = self.payload.len();

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        buf.push(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        if payload_len <= 125 {
            buf.push(mask_bit | payload_len as u8);
        } else if payload_len <= 65535 {
            buf.push(mask_bit | 126);
            buf.extend_from_slice(&(payload_len as u16).to_be_bytes());
        } else {
            buf.push(mask_bit | 127);
            buf.extend_from_slice(&(payload_len as u64).to_be_bytes());
        }

        match mask {
            Some(key) => {
                buf.extend_from_slice(&key);
                let start = buf.len();
                buf.extend_from_slice(&self.payload);
                apply_mask(&mut buf[start..], key);
            }
            None => buf.extend_from_slice(&self.payload),
        }
    }

    /// Encoded size of this frame on the wire.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let payload_len = self.payload.len();
        let ext = if payload_len <= 125 {
            0
        } else if payload_len <= 65535 {
            2
        } else {
            8
        };
        2 + ext + if masked { 4 } else { 0 } + payload_len
    }
}
