//! Echo server on port 8080.
//!
//! Run with `cargo run --example echo_server`, then connect from a browser
//! console:
//!
//! ```text
//! const ws = new WebSocket("ws://localhost:8080");
//! ws.onmessage = (e) => console.log(e.data);
//! ws.onopen = () => ws.send("hi");
//! ```

use wsframed::{Result, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let server = Server::new(ServerConfig::default());
    server.run().await
}
