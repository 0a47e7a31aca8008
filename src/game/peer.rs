//! Cloneable handle to one client connection
//!
//! Other tasks (the opponent's reader, the matchmaker) use it to push lines
//! to the client's writer task or to ask the reader to shut down.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use super::outbound::ServerMsg;

/// Work item for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Line(String),
    /// Flush what is queued, then shut the socket
    Close,
}

struct PeerInner {
    id: Uuid,
    addr: SocketAddr,
    name: OnceLock<String>,
    tx: mpsc::UnboundedSender<Outgoing>,
    kick: Notify,
    closing: AtomicBool,
}

#[derive(Clone)]
pub struct PeerHandle {
    inner: Arc<PeerInner>,
}

impl PeerHandle {
    pub fn new(addr: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            inner: Arc::new(PeerInner {
                id: Uuid::new_v4(),
                addr,
                name: OnceLock::new(),
                tx,
                kick: Notify::new(),
                closing: AtomicBool::new(false),
            }),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Queue a token for the client. Returns false once the writer is gone.
    pub fn send(&self, msg: &ServerMsg) -> bool {
        self.inner.tx.send(Outgoing::Line(msg.to_string())).is_ok()
    }

    /// Bind the login name. Only the first call has any effect.
    pub fn set_name(&self, name: &str) -> bool {
        self.inner.name.set(name.to_string()).is_ok()
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.get().map(String::as_str)
    }

    /// Ask the connection's reader to stop and tear down
    pub fn kick(&self) {
        self.inner.kick.notify_one();
    }

    /// Resolves once `kick` has been called
    pub async fn kicked(&self) {
        self.inner.kick.notified().await;
    }

    /// Claim the right to tear this connection down. True for exactly one caller.
    pub fn begin_close(&self) -> bool {
        self.inner
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::Acquire)
    }

    pub fn close_writer(&self) {
        let _ = self.inner.tx.send(Outgoing::Close);
    }
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_peer() -> (PeerHandle, mpsc::UnboundedReceiver<Outgoing>) {
    PeerHandle::new(SocketAddr::from(([127, 0, 0, 1], 0)))
}
