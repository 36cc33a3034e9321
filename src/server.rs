//! TCP accept loop, per-connection tasks, and the message handler seam.
//!
//! Each accepted socket gets its own task: perform the upgrade handshake,
//! register with the [`Registry`], then drive the connection until close or
//! error. The handler decides what to do with each received message; the
//! default [`EchoHandler`] echoes data messages back to the sender.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::handshake::{UpgradeRequest, accept_response, rejection_response};
use crate::registry::{ConnectionId, Registry};

/// Upper bound on the size of an upgrade request head.
const MAX_HANDSHAKE_BYTES: usize = 8 * 1024;

/// Application callback for received messages.
///
/// One handler instance is shared by all connection tasks, so implementations
/// must be `Send + Sync`.
pub trait Handler: Send + Sync + 'static {
    /// A data message arrived. Return `Some` to send a reply to the same
    /// connection.
    fn on_message(&self, id: ConnectionId, message: &Message) -> Option<Message>;

    /// A connection finished its handshake and is registered.
    fn on_connect(&self, _id: ConnectionId) {}

    /// A connection closed or failed and is unregistered.
    fn on_disconnect(&self, _id: ConnectionId) {}
}

/// Default handler: echo every data message back, with a greeting
/// substitution for `hi` and `hii`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn on_message(&self, _id: ConnectionId, message: &Message) -> Option<Message> {
        match message {
            Message::Text(text) if text == "hi" || text == "hii" => {
                Some(Message::text("hello"))
            }
            Message::Text(_) | Message::Binary(_) => Some(message.clone()),
            _ => None,
        }
    }
}

/// WebSocket server: listener configuration, connection registry, and the
/// shared message handler.
pub struct Server<H> {
    config: ServerConfig,
    registry: Registry,
    handler: Arc<H>,
}

impl Server<EchoHandler> {
    /// Server with the default echo handler.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_handler(config, EchoHandler)
    }
}

impl<H: Handler> Server<H> {
    /// Server with a custom handler.
    #[must_use]
    pub fn with_handler(config: ServerConfig, handler: H) -> Self {
        Self {
            config,
            registry: Registry::new(),
            handler: Arc::new(handler),
        }
    }

    /// Handle to the connection registry, for broadcast or targeted sends
    /// from outside the handler.
    #[must_use]
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Bind the configured port and accept connections until the task is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the listener cannot be bound. Per-connection
    /// failures are logged and do not stop the loop.
    pub async fn run(&self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if `accept` fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "listening");
        }

        loop {
            let (socket, peer) = listener.accept().await?;
            debug!(%peer, "accepted");

            let config = self.config.clone();
            let registry = self.registry.clone();
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                if let Err(err) = serve_socket(socket, config, registry, handler).await {
                    warn!(%peer, error = %err, "connection ended with error");
                }
            });
        }
    }
}

async fn serve_socket<H: Handler>(
    mut socket: TcpStream,
    config: ServerConfig,
    registry: Registry,
    handler: Arc<H>,
) -> Result<()> {
    let accept = match handshake(&mut socket).await {
        Ok(accept) => accept,
        Err(err) => {
            // Reject and drop; the listener keeps running.
            let _ = socket.write_all(&rejection_response()).await;
            return Err(err);
        }
    };
    socket.write_all(&accept_response(&accept)).await?;

    let connection = Connection::new(socket, config.limits);
    drive_connection(connection, registry, handler).await
}

/// Read the request head up to the blank line and negotiate the upgrade.
async fn handshake<T: AsyncRead + Unpin>(io: &mut T) -> Result<String> {
    let mut head = Vec::with_capacity(512);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_HANDSHAKE_BYTES {
            return Err(Error::Handshake("request head too large".into()));
        }
        let n = io.read(&mut byte).await?;
        if n == 0 {
            return Err(Error::Handshake("connection closed mid-handshake".into()));
        }
        head.push(byte[0]);
    }

    UpgradeRequest::parse(&head)?.negotiate()
}

/// Pump one established connection: interleave inbound messages with
/// outbound messages queued through the registry.
async fn drive_connection<T, H>(
    mut connection: Connection<T>,
    registry: Registry,
    handler: Arc<H>,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    H: Handler,
{
    let (id, mut outbound) = registry.register();
    handler.on_connect(id);
    info!(%id, "connection open");

    let result = loop {
        tokio::select! {
            received = connection.recv() => match received {
                Ok(Some(message)) => {
                    if message.is_data() {
                        if let Some(reply) = handler.on_message(id, &message) {
                            if let Err(err) = connection.send(reply).await {
                                break Err(err);
                            }
                        }
                    }
                }
                Ok(None) => break Ok(()),
                Err(err) => {
                    error!(%id, error = %err, "protocol failure");
                    break Err(err);
                }
            },
            queued = outbound.recv() => match queued {
                Some(message) => {
                    if let Err(err) = connection.send(message).await {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            },
        }
    };

    registry.unregister(id);
    handler.on_disconnect(id);
    info!(%id, "connection closed");
    result
}
