//! Per-connection byte stream to frame stream reassembly.
//!
//! A stream transport delivers arbitrary, unaligned chunks: one delivered
//! chunk may contain zero, one, or many frames, and one frame may span many
//! chunks. The reassembler buffers fed chunks and drains complete frames
//! until the codec reports it needs more bytes, retaining the remainder for
//! the next [`feed`](StreamReassembler::feed) call.
//!
//! The server-role masking rule and the per-frame size limit are enforced
//! here by peeking the header before a full parse, so an oversized or
//! unmasked frame is rejected without buffering its payload.

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::Frame;

/// Stateful chunk-to-frame reassembler for one connection.
///
/// A protocol error poisons the reassembler permanently: no further frames
/// are produced after the first violation.
#[derive(Debug)]
pub struct StreamReassembler {
    buf: BytesMut,
    max_frame_size: usize,
    poisoned: bool,
}

impl StreamReassembler {
    /// Create a reassembler rejecting frames whose payload exceeds
    /// `max_frame_size`.
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            max_frame_size,
            poisoned: false,
        }
    }

    /// Append one transport chunk. Safe to call with partial, empty, or
    /// multi-frame chunks in any split.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of buffered, not yet consumed bytes.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Whether a previous protocol error stopped reassembly.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Drain the next complete frame, or `None` when the buffered bytes end
    /// mid-frame. Call repeatedly after each `feed` until it returns `None`.
    ///
    /// # Errors
    ///
    /// Any protocol error (reserved opcode, RSV bits, unmasked client frame,
    /// oversized frame, malformed control frame) is returned once and
    /// poisons the reassembler; later calls keep failing.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.poisoned {
            return Err(Error::ProtocolViolation(
                "reassembly stopped after protocol error".into(),
            ));
        }
        match self.try_next() {
            Ok(frame) => Ok(frame),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    fn try_next(&mut self) -> Result<Option<Frame>> {
        if self.buf.len() < 2 {
            return Ok(None);
        }

        // Server role: every incoming frame is a client frame and must be
        // masked (RFC 6455 Section 5.1).
        if self.buf[1] & 0x80 == 0 {
            return Err(Error::UnmaskedClientFrame);
        }

        // Enforce the frame size limit as soon as the declared length is
        // readable, before the payload has been buffered.
        if let Some(len) = self.peek_payload_len() {
            if len > self.max_frame_size as u64 {
                return Err(Error::FrameTooLarge {
                    size: usize::try_from(len).unwrap_or(usize::MAX),
                    max: self.max_frame_size,
                });
            }
        }

        match Frame::parse(&self.buf) {
            Ok((frame, consumed)) => {
                frame.validate()?;
                self.buf.advance(consumed);
                Ok(Some(frame))
            }
            Err(Error::IncompleteFrame { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Declared payload length, if enough header bytes are buffered to read
    /// the length field of the applicable tier.
    fn peek_payload_len(&self) -> Option<u64> {
        match self.buf[1] & 0x7F {
            len @ 0..=125 => Some(u64::from(len)),
            126 if self.buf.len() >= 4 => {
                Some(u64::from(u16::from_be_bytes([self.buf[2], self.buf[3]])))
            }
            127 if self.buf.len() >= 10 => Some(u64::from_be_bytes([
                self.buf[2],
                self.buf[3],
                self.buf[4],
                self.buf[5],
                self.buf[6],
                self.buf[7],
                self.buf[8],
                self.buf[9],
            ])),
            _ => None,
        }
    }
}
