//! Error types for the server-side WebSocket core.
//!
//! Variants fall into three groups: handshake rejections (recovered with an
//! HTTP 400), protocol violations (always fatal to the connection), and
//! transport failures (propagate to connection teardown).

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating, framing, or running a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Upgrade request failed validation. Answered with `400 Bad Request`.
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    /// Generic protocol violation (interleaved data frames, orphan
    /// continuation, data after close, ...). Fatal to the connection.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Reserved opcode (0x3-0x7, 0xB-0xF) on the wire.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// RSV bits set without a negotiated extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Control frame with FIN=0.
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload over the 125-byte limit.
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Client frame arrived without a mask key.
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Completed text message is not valid UTF-8.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Single frame payload exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual payload size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Reassembled message exceeds the configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Fragment count exceeds the configured maximum.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Declared payload length does not fit in usize on this platform.
    #[error("Payload length {size} exceeds platform maximum")]
    PayloadTooLarge {
        /// Declared 64-bit payload length.
        size: u64,
    },

    /// Not enough buffered bytes to decode a complete frame. This is the
    /// decode suspension signal, not a failure.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Peer closed the transport.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Underlying read or write failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this error must terminate the connection.
    ///
    /// `IncompleteFrame` is a resumption point and `Handshake` never reaches
    /// an established connection; everything else is fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::IncompleteFrame { .. } | Error::Handshake(_))
    }

    /// RFC 6455 close code for the best-effort close frame sent before
    /// tearing a connection down over this error.
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self {
            Error::InvalidUtf8 => 1007,
            Error::FrameTooLarge { .. }
            | Error::MessageTooLarge { .. }
            | Error::TooManyFragments { .. }
            | Error::PayloadTooLarge { .. } => 1009,
            _ => 1002,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MessageTooLarge {
            size: 70_000_000,
            max: 64_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Message too large: 70000000 bytes (max: 64000000)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_incomplete_frame_is_not_fatal() {
        assert!(!Error::IncompleteFrame { needed: 4 }.is_fatal());
        assert!(Error::UnmaskedClientFrame.is_fatal());
        assert!(Error::ReservedOpcode(0x3).is_fatal());
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(Error::InvalidUtf8.close_code(), 1007);
        assert_eq!(Error::MessageTooLarge { size: 2, max: 1 }.close_code(), 1009);
        assert_eq!(Error::ReservedBitsSet.close_code(), 1002);
    }
}
