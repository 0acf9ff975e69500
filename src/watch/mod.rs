//! Debounced filesystem watcher.
//!
//! Wraps OS change notifications over a set of root paths and coalesces
//! bursts of events into one callback invocation.
//!
//! ```text
//! notify --> event channel --> qualify --> Debounce (rearm) --> on_change()
//!                                 |
//!                                 +--> directory added/removed? update watches
//! ```
//!
//! `start` blocks the calling thread; `stop` may be called from any thread.

mod debounce;
mod roots;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, select};
use notify::event::ModifyKind;
use notify::{Event, EventKind};
use thiserror::Error;

use debounce::Debounce;
use roots::WatchSet;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Notify(#[from] notify::Error),
}

/// Debounced watcher over a fixed set of roots.
pub struct Watcher {
    roots: Vec<PathBuf>,
    debounce: Duration,
    on_change: Box<dyn Fn() + Send + Sync>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    stopped: AtomicBool,
}

impl Watcher {
    /// Create a watcher that invokes `on_change` once per debounced burst.
    pub fn new<F>(roots: Vec<PathBuf>, debounce: Duration, on_change: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded(1);
        Self {
            roots,
            debounce,
            on_change: Box::new(on_change),
            stop_tx,
            stop_rx,
            stopped: AtomicBool::new(false),
        }
    }

    /// Create a watcher that reports changes as signals on a channel.
    ///
    /// The channel holds one pending signal; firings that happen while the
    /// subscriber is still busy collapse into it.
    pub fn channel(roots: Vec<PathBuf>, debounce: Duration) -> (Self, Receiver<()>) {
        let (tx, rx) = channel::bounded(1);
        let watcher = Self::new(roots, debounce, move || {
            let _ = tx.try_send(());
        });
        (watcher, rx)
    }

    /// Register the roots and run the event loop until [`Watcher::stop`].
    ///
    /// Only failing to create the notification backend is an error.
    pub fn start(&self) -> Result<(), WatchError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (event_tx, event_rx) = channel::unbounded();
        let mut backend = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })?;

        let mut watch_set = WatchSet::new(self.roots.clone());
        watch_set.attach_all(&mut backend);
        crate::debug!("watch"; "watching {} path(s)", watch_set.len());

        let mut debounce = Debounce::new(self.debounce);

        loop {
            let timer = debounce
                .deadline()
                .map_or_else(channel::never, channel::at);

            select! {
                recv(event_rx) -> msg => match msg {
                    Ok(Ok(event)) if is_qualifying(&event) => {
                        crate::debug!("watch"; "{:?} {:?}", event.kind, event.paths);
                        if may_change_tree(&event.kind) {
                            for path in &event.paths {
                                // Recreated paths get a fresh watch
                                if drops_watch(&event.kind) {
                                    watch_set.detach(&mut backend, path);
                                }
                                let added = watch_set.reattach(&mut backend, path);
                                if added > 0 {
                                    crate::debug!("watch"; "new path {} ({} registered)", path.display(), added);
                                }
                            }
                        }
                        debounce.arm(Instant::now());
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => crate::log!("watch"; "notify error: {}", e),
                    Err(_) => break,
                },
                recv(self.stop_rx) -> _ => break,
                recv(timer) -> _ => {
                    if debounce.take_due(Instant::now()) {
                        (self.on_change)();
                    }
                }
            }
        }

        debounce.cancel();
        drop(backend);
        crate::debug!("watch"; "stopped");
        Ok(())
    }

    /// Make [`Watcher::start`] return. Only the first call has an effect.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.try_send(());
    }
}

/// Create, write, remove and rename events qualify; metadata-only changes
/// and events that only touch editor artifacts do not.
fn is_qualifying(event: &Event) -> bool {
    let kind = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    kind && (event.paths.is_empty() || event.paths.iter().any(|p| !is_temp_file(p)))
}

/// Events that can add or remove directories in a watched tree.
fn may_change_tree(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Events after which a registered path may no longer be watched.
fn drops_watch(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
