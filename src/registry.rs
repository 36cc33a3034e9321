//! Connection registry.
//!
//! Tracks the set of live connections so server-side code can enumerate or
//! address them (broadcast, targeted send, shutdown). Each connection is
//! reachable through an unbounded channel sender; the owning task drains the
//! channel and writes to its own transport, so the registry lock is never
//! held across I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Message;

/// Opaque identifier for a registered connection, unique for the lifetime
/// of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared set of live connections.
///
/// Cheap to clone; all clones observe the same set. The inner mutex guards
/// only map operations, never awaits.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, mpsc::UnboundedSender<Message>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, returning its id and the receiving half of its
    /// outbound channel. The owning task forwards received messages to the
    /// transport.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut connections) = self.inner.connections.lock() {
            connections.insert(id, tx);
        }
        debug!(id, "connection registered");
        (ConnectionId(id), rx)
    }

    /// Remove a connection. Removing an already absent id is a no-op.
    pub fn unregister(&self, id: ConnectionId) {
        if let Ok(mut connections) = self.inner.connections.lock() {
            connections.remove(&id.0);
        }
        debug!(id = id.0, "connection unregistered");
    }

    /// Queue a message to one connection. Returns `false` when the id is
    /// unknown or its task has already dropped the receiver.
    pub fn send_to(&self, id: ConnectionId, message: Message) -> bool {
        let Ok(connections) = self.inner.connections.lock() else {
            return false;
        };
        connections
            .get(&id.0)
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Queue a message to every live connection, returning how many
    /// accepted it.
    pub fn broadcast(&self, message: &Message) -> usize {
        let Ok(connections) = self.inner.connections.lock() else {
            return 0;
        };
        connections
            .values()
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count()
    }

    /// Ids of all currently registered connections.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConnectionId> {
        let Ok(connections) = self.inner.connections.lock() else {
            return Vec::new();
        };
        let mut ids: Vec<_> = connections.keys().copied().map(ConnectionId).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .connections
            .lock()
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
