//! Connection lifecycle states.

/// Lifecycle phase of a connection.
///
/// `Handshaking -> Open -> Closing -> Closed`, with `Closing` skipped on
/// abrupt transport loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Upgrade negotiation in progress.
    #[default]
    Handshaking,
    /// Established; data flows both ways.
    Open,
    /// Close handshake started, waiting for the peer's close frame.
    Closing,
    /// Transport terminated.
    Closed,
}

impl ConnectionState {
    /// Sending data is allowed only while open.
    #[inline]
    #[must_use]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Receiving continues through the close handshake.
    #[inline]
    #[must_use]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Handshaking => "Handshaking",
            ConnectionState::Open => "Open",
            ConnectionState::Closing => "Closing",
            ConnectionState::Closed => "Closed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_handshaking() {
        assert_eq!(ConnectionState::default(), ConnectionState::Handshaking);
    }

    #[test]
    fn test_can_send() {
        assert!(!ConnectionState::Handshaking.can_send());
        assert!(ConnectionState::Open.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(!ConnectionState::Closed.can_send());
    }

    #[test]
    fn test_can_receive() {
        assert!(!ConnectionState::Handshaking.can_receive());
        assert!(ConnectionState::Open.can_receive());
        assert!(ConnectionState::Closing.can_receive());
        assert!(!ConnectionState::Closed.can_receive());
    }
}
