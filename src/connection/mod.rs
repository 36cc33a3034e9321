//! Connection orchestration: lifecycle state and the receive/send loop.

mod connection;
mod state;

pub use connection::Connection;
pub use state::ConnectionState;
