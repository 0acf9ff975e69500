//! Shutdown state.
//!
//! Ctrl+C is handled once per process. Before anything asks for a
//! [`shutdown_signal`] the process exits right away; afterwards the
//! signal is delivered on a channel so servers can shut down gracefully.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender, set by the first [`shutdown_signal`] call
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();
static SHUTDOWN_RX: OnceLock<Receiver<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                let _ = tx.try_send(());
            }
            // Nothing to shut down gracefully
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Receiver that yields once when Ctrl+C is pressed.
///
/// Every call returns a handle to the same channel.
pub fn shutdown_signal() -> Receiver<()> {
    SHUTDOWN_RX
        .get_or_init(|| {
            let (tx, rx) = channel::bounded(1);
            let _ = SHUTDOWN_TX.set(tx);
            rx
        })
        .clone()
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
