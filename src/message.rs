//! Logical message types and close codes (RFC 6455 Sections 5.6, 7.4).

use crate::protocol::{Frame, OpCode};

/// Close status code (RFC 6455 Section 7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// 1000, normal closure.
    #[default]
    Normal,
    /// 1001, endpoint going away.
    GoingAway,
    /// 1002, protocol error.
    ProtocolError,
    /// 1003, unsupported data type.
    UnsupportedData,
    /// 1007, invalid payload data (e.g. non-UTF-8 text).
    InvalidPayload,
    /// 1008, policy violation.
    PolicyViolation,
    /// 1009, message too big.
    MessageTooBig,
    /// 1011, unexpected server condition.
    InternalError,
    /// Registered or application-defined code.
    Other(u16),
}

impl CloseCode {
    /// Decode a wire code.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Wire value of this code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }
}

/// Parsed close frame body: status code plus optional UTF-8 reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close status code.
    pub code: CloseCode,
    /// Human-readable reason, at most 123 bytes.
    pub reason: String,
}

impl CloseFrame {
    /// Create a close frame body.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Application-visible unit of communication.
///
/// Data messages are produced only once all fragments have been reassembled;
/// control events surface as they arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// UTF-8 text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
    /// Ping received (a pong echo is sent automatically).
    Ping(Vec<u8>),
    /// Pong received.
    Pong(Vec<u8>),
    /// Close received or initiated, with the parsed body if present.
    Close(Option<CloseFrame>),
}

impl Message {
    /// Text message from anything string-like.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Binary message from anything byte-like.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// True for ping, pong, and close.
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(
            self,
            Message::Ping(_) | Message::Pong(_) | Message::Close(_)
        )
    }

    /// True for text and binary.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Message::Text(_) | Message::Binary(_))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::text(text.into_bytes()),
            Message::Binary(data) => Frame::binary(data),
            Message::Ping(data) => Frame::new(true, OpCode::Ping, data),
            Message::Pong(data) => Frame::new(true, OpCode::Pong, data),
            Message::Close(Some(cf)) => Frame::close(Some(cf.code.as_u16()), &cf.reason),
            Message::Close(None) => Frame::close(None, ""),
        }
    }
}
