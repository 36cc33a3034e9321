//! Server-side WebSocket framing and handshake core (RFC 6455 subset).
//!
//! Layers, bottom up:
//!
//! - [`protocol::frame`] — wire frame encode/decode with the three-tier
//!   length encoding and XOR masking
//! - [`protocol::reassembler`] — arbitrary transport chunks to complete
//!   frames
//! - [`protocol::assembler`] — fragmented frames to logical messages
//! - [`protocol::handshake`] — HTTP upgrade negotiation and accept token
//! - [`connection`] — per-connection receive/send loop with automatic
//!   ping/pong and close-handshake handling
//! - [`server`] — TCP accept loop, connection registry, handler seam
//!
//! # Example
//!
//! ```no_run
//! use wsframed::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> wsframed::Result<()> {
//!     let server = Server::new(ServerConfig::new(8080));
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod server;

pub use config::{Limits, ServerConfig};
pub use connection::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{Frame, OpCode};
pub use registry::{ConnectionId, Registry};
pub use server::{EchoHandler, Handler, Server};
