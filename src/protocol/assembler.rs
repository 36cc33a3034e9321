//! Fragment-to-message reassembly (RFC 6455 Section 5.4).
//!
//! Two states per connection: idle, or accumulating the fragments of one
//! message. Control frames pass through without disturbing the accumulator;
//! they may legally interleave between fragments. Text payloads are checked
//! for valid UTF-8 only once the message is complete.

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};

/// Merges a sequence of data frames into complete logical messages.
pub struct MessageAssembler {
    buffer: BytesMut,
    opcode: Option<OpCode>,
    fragment_count: usize,
    limits: Limits,
}

impl MessageAssembler {
    /// Create an assembler bounded by `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            opcode: None,
            fragment_count: 0,
            limits,
        }
    }

    /// Whether a fragmented message is in progress.
    #[must_use]
    pub fn is_accumulating(&self) -> bool {
        self.opcode.is_some()
    }

    /// Feed one data frame. Returns the complete message when this frame
    /// carried `fin=true`, `None` while fragments are still outstanding.
    ///
    /// Control frames are ignored here; the connection handles them out of
    /// band before they reach the assembler.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a continuation without a started
    ///   message, or a new text/binary start while one is in progress
    /// - `Error::TooManyFragments` / `Error::MessageTooLarge` when limits
    ///   are exceeded
    /// - `Error::InvalidUtf8` when a completed text message is not UTF-8
    pub fn push(&mut self, frame: Frame) -> Result<Option<AssembledMessage>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        match (self.opcode, frame.opcode) {
            (None, OpCode::Continuation) => {
                return Err(Error::ProtocolViolation(
                    "continuation frame without a started message".into(),
                ));
            }
            (None, opcode) => self.opcode = Some(opcode),
            (Some(_), OpCode::Continuation) => {}
            (Some(_), _) => {
                // A second start frame interleaved into an unfinished
                // message from the same peer is forbidden.
                return Err(Error::ProtocolViolation(
                    "new data frame while a fragmented message is in progress".into(),
                ));
            }
        }

        self.fragment_count += 1;
        if self.fragment_count > self.limits.max_fragment_count {
            return Err(Error::TooManyFragments {
                count: self.fragment_count,
                max: self.limits.max_fragment_count,
            });
        }

        let new_size = self.buffer.len() + frame.payload.len();
        if new_size > self.limits.max_message_size {
            return Err(Error::MessageTooLarge {
                size: new_size,
                max: self.limits.max_message_size,
            });
        }
        self.buffer.extend_from_slice(&frame.payload);

        if !frame.fin {
            return Ok(None);
        }

        let opcode = self.opcode.take().unwrap_or(frame.opcode);
        let payload = self.buffer.split().to_vec();
        self.fragment_count = 0;

        if opcode == OpCode::Text && std::str::from_utf8(&payload).is_err() {
            return Err(Error::InvalidUtf8);
        }
        Ok(Some(AssembledMessage { opcode, payload }))
    }

    /// Discard any in-progress accumulation.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.opcode = None;
        self.fragment_count = 0;
    }
}

/// A fully assembled logical message.
pub struct AssembledMessage {
    /// `Text` or `Binary`; never a continuation or control opcode.
    pub opcode: OpCode,
    /// Concatenated fragment payloads.
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    fn tight_assembler() -> MessageAssembler {
        MessageAssembler::new(Limits {
            max_frame_size: 1024,
            max_message_size: 100,
            max_fragment_count: 3,
        })
    }

    #[test]
    fn test_unfragmented_message_emitted_immediately() {
        let mut asm = assembler();
        let msg = asm.push(Frame::text(b"Hello".to_vec())).unwrap().unwrap();
        assert_eq!(msg.opcode, OpCode::Text);
        assert_eq!(msg.payload, b"Hello");
        assert!(!asm.is_accumulating());
    }

    #[test]
    fn test_three_fragment_text_message() {
        let mut asm = assembler();
        assert!(asm
            .push(Frame::new(false, OpCode::Text, b"one ".to_vec()))
            .unwrap()
            .is_none());
        assert!(asm.is_accumulating());
        assert!(asm
            .push(Frame::new(false, OpCode::Continuation, b"two ".to_vec()))
            .unwrap()
            .is_none());
        let msg = asm
            .push(Frame::new(true, OpCode::Continuation, b"three".to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(msg.opcode, OpCode::Text);
        assert_eq!(msg.payload, b"one two three");
        assert!(!asm.is_accumulating());
    }

    #[test]
    fn test_control_frame_does_not_disturb_accumulator() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, b"Hel".to_vec()))
            .unwrap();
        assert!(asm.push(Frame::ping(b"keepalive".to_vec())).unwrap().is_none());
        assert!(asm.is_accumulating());

        let msg = asm
            .push(Frame::new(true, OpCode::Continuation, b"lo".to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload, b"Hello");
    }

    #[test]
    fn test_continuation_without_start_fails() {
        let mut asm = assembler();
        let result = asm.push(Frame::new(true, OpCode::Continuation, b"x".to_vec()));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_interleaved_start_frame_fails() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, b"first".to_vec()))
            .unwrap();
        let result = asm.push(Frame::new(true, OpCode::Text, b"second".to_vec()));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_binary_fragments_keep_opcode() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Binary, vec![1, 2]))
            .unwrap();
        let msg = asm
            .push(Frame::new(true, OpCode::Continuation, vec![3, 4]))
            .unwrap()
            .unwrap();
        assert_eq!(msg.opcode, OpCode::Binary);
        assert_eq!(msg.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_utf8_validated_only_when_complete() {
        let mut asm = assembler();
        // A 4-byte emoji split mid-sequence across fragments.
        assert!(asm
            .push(Frame::new(false, OpCode::Text, vec![0xf0, 0x9f]))
            .unwrap()
            .is_none());
        let msg = asm
            .push(Frame::new(true, OpCode::Continuation, vec![0x8e, 0x89]))
            .unwrap()
            .unwrap();
        assert_eq!(std::str::from_utf8(&msg.payload).unwrap(), "\u{1F389}");
    }

    #[test]
    fn test_invalid_utf8_text_fails() {
        let mut asm = assembler();
        let result = asm.push(Frame::new(true, OpCode::Text, vec![0x80, 0x81]));
        assert!(matches!(result, Err(Error::InvalidUtf8)));
    }

    #[test]
    fn test_binary_skips_utf8_validation() {
        let mut asm = assembler();
        let msg = asm
            .push(Frame::new(true, OpCode::Binary, vec![0x80, 0x81, 0xff]))
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload, vec![0x80, 0x81, 0xff]);
    }

    #[test]
    fn test_message_size_limit() {
        let mut asm = tight_assembler();
        let result = asm.push(Frame::new(true, OpCode::Binary, vec![0u8; 150]));
        assert!(matches!(result, Err(Error::MessageTooLarge { .. })));
    }

    #[test]
    fn test_fragment_count_limit() {
        let mut asm = tight_assembler();
        asm.push(Frame::new(false, OpCode::Binary, vec![1])).unwrap();
        asm.push(Frame::new(false, OpCode::Continuation, vec![2]))
            .unwrap();
        asm.push(Frame::new(false, OpCode::Continuation, vec![3]))
            .unwrap();
        let result = asm.push(Frame::new(true, OpCode::Continuation, vec![4]));
        assert!(matches!(result, Err(Error::TooManyFragments { .. })));
    }

    #[test]
    fn test_reset_discards_partial_message() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, b"partial".to_vec()))
            .unwrap();
        asm.reset();
        assert!(!asm.is_accumulating());

        let msg = asm.push(Frame::text(b"fresh".to_vec())).unwrap().unwrap();
        assert_eq!(msg.payload, b"fresh");
    }
}
