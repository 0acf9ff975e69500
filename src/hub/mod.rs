//! WebSocket fan-out hub.
//!
//! A single event-loop thread owns the connection registry. Everything
//! else talks to it through channels:
//!
//! ```text
//! accept    --register--> +-----------+ --"reload"--> clients
//! reader    --unregister> |  Hub::run |
//! broadcast --message---> +-----------+
//! ```
//!
//! Only the client count is shared, behind a short-lived mutex.

mod client;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError, select};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub use client::{WS_PATH, accept};

/// The only message ever sent to browsers.
pub const RELOAD: &str = "reload";

/// Outbound queue capacity. Broadcasts beyond it are dropped.
const BROADCAST_BUFFER: usize = 16;

pub type ClientId = u64;

/// A registered duplex connection, seen from the writing side.
pub trait Client: Send {
    fn send(&mut self, text: &str) -> tungstenite::Result<()>;
    fn close(&mut self);
}

/// Connection registry with a single-writer event loop.
pub struct Hub {
    register_tx: Sender<(ClientId, Box<dyn Client>)>,
    register_rx: Receiver<(ClientId, Box<dyn Client>)>,
    unregister_tx: Sender<ClientId>,
    unregister_rx: Receiver<ClientId>,
    broadcast_tx: Sender<String>,
    broadcast_rx: Receiver<String>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    /// Mirror of the registry size, written by the loop only
    count: Mutex<usize>,
    next_id: AtomicU64,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    /// Create an idle hub. Nothing happens until [`Hub::run`].
    pub fn new() -> Self {
        let (register_tx, register_rx) = channel::unbounded();
        let (unregister_tx, unregister_rx) = channel::unbounded();
        let (broadcast_tx, broadcast_rx) = channel::bounded(BROADCAST_BUFFER);
        let (stop_tx, stop_rx) = channel::bounded(1);
        Self {
            register_tx,
            register_rx,
            unregister_tx,
            unregister_rx,
            broadcast_tx,
            broadcast_rx,
            stop_tx,
            stop_rx,
            count: Mutex::new(0),
            next_id: AtomicU64::new(1),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run the event loop on the current thread until [`Hub::stop`].
    pub fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            crate::log!("hub"; "event loop already running");
            return;
        }

        let mut clients: FxHashMap<ClientId, Box<dyn Client>> = FxHashMap::default();

        loop {
            select! {
                recv(self.register_rx) -> msg => {
                    if let Ok((id, client)) = msg {
                        clients.insert(id, client);
                        self.publish_count(clients.len());
                        crate::debug!("hub"; "client {} connected (total: {})", id, clients.len());
                    }
                }
                recv(self.unregister_rx) -> msg => {
                    if let Ok(id) = msg
                        && let Some(mut client) = clients.remove(&id)
                    {
                        client.close();
                        self.publish_count(clients.len());
                        crate::debug!("hub"; "client {} disconnected (total: {})", id, clients.len());
                    }
                }
                recv(self.broadcast_rx) -> msg => {
                    if let Ok(text) = msg {
                        deliver(&mut clients, &text);
                        self.publish_count(clients.len());
                    }
                }
                recv(self.stop_rx) -> _ => break,
            }
        }

        for (_, mut client) in clients.drain() {
            client.close();
        }
        self.close_pending();
        self.publish_count(0);
        crate::debug!("hub"; "stopped");
    }

    /// Queue `message` for every connected client without blocking.
    ///
    /// Returns `false` when the message was dropped.
    pub fn broadcast(&self, message: impl Into<String>) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        match self.broadcast_tx.try_send(message.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::debug!("hub"; "outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Hand a connection to the event loop.
    ///
    /// After [`Hub::stop`] the connection is closed instead.
    pub fn register(&self, mut client: Box<dyn Client>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.stopped.load(Ordering::SeqCst) {
            client.close();
        } else {
            if let Err(e) = self.register_tx.send((id, client)) {
                let (_, mut client) = e.into_inner();
                client.close();
            }
            if !self.stopped.load(Ordering::SeqCst) {
                return id;
            }
        }
        // Stopped around the send: the loop may already have drained the queue
        self.close_pending();
        id
    }

    /// Ask the event loop to drop and close a connection, if still present.
    pub fn unregister(&self, id: ClientId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Point-in-time number of registered connections.
    pub fn client_count(&self) -> usize {
        *self.count.lock()
    }

    /// Close every connection and make [`Hub::run`] return. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.try_send(());
        // Without a running loop nothing else will close queued registrations
        if !self.running.load(Ordering::SeqCst) {
            self.close_pending();
        }
    }

    /// Close registrations still queued for the loop.
    fn close_pending(&self) {
        for (_, mut client) in self.register_rx.try_iter() {
            client.close();
        }
    }

    fn publish_count(&self, len: usize) {
        *self.count.lock() = len;
    }
}

/// Send `text` to every client; failed clients are removed and closed.
fn deliver(clients: &mut FxHashMap<ClientId, Box<dyn Client>>, text: &str) {
    if clients.is_empty() {
        crate::debug!("hub"; "no clients connected");
        return;
    }

    let total = clients.len();
    clients.retain(|id, client| match client.send(text) {
        Ok(()) => true,
        Err(e) => {
            crate::debug!("hub"; "client {} dropped: {}", id, e);
            client.close();
            false
        }
    });
    crate::debug!("hub"; "broadcast to {} of {} clients", clients.len(), total);
}
