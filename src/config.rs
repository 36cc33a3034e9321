//! Server configuration and resource limits.

/// Resource limits bounding per-connection memory use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload of a single frame.
    ///
    /// Default: 16 MB.
    pub max_frame_size: usize,

    /// Maximum size of a reassembled message.
    ///
    /// Default: 64 MB.
    pub max_message_size: usize,

    /// Maximum number of fragments in one message.
    ///
    /// Default: 128.
    pub max_fragment_count: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_fragment_count: 128,
        }
    }
}

/// Listener configuration.
///
/// The port is the only externally persisted parameter; everything else is
/// in-process tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port to bind.
    pub port: u16,
    /// Per-connection resource limits.
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    /// Configuration listening on `port` with default limits.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Replace the resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
