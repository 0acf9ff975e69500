//! Agent wiring: invalidate and notify, reload lazily on the next read.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Receiver;

use crate::agent::{Notifier, PAGES_URI};
use crate::context::SiteContext;

/// Mark `context` stale and notify the client on every change signal.
pub fn spawn(
    changes: Receiver<()>,
    context: Arc<SiteContext>,
    notifier: Notifier,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("invalidate".into()).spawn(move || {
        for () in changes.iter() {
            invalidate(&context, &notifier);
        }
    })
}

pub fn invalidate(context: &SiteContext, notifier: &Notifier) {
    context.mark_dirty();
    crate::debug!("agent"; "content changed");
    if let Err(e) = notifier.resource_updated(PAGES_URI) {
        crate::log!("agent"; "failed to send notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};

    use crossbeam::channel;
    use parking_lot::Mutex;

    use crate::context::FsSource;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_each_signal_marks_dirty_and_notifies() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = temp.path().join("forge.toml");
        std::fs::write(&config, "").unwrap();
        std::fs::create_dir_all(temp.path().join("content")).unwrap();

        let context = Arc::new(SiteContext::new(FsSource, config));
        context.load().unwrap();
        assert!(!context.is_dirty());

        let buf = SharedBuf::default();
        let (tx, rx) = channel::unbounded();

        let handle = spawn(rx, Arc::clone(&context), Notifier::new(buf.clone())).unwrap();
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        drop(tx);
        handle.join().unwrap();

        assert!(context.is_dirty());
        let out = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().all(|l| l.contains("\"uri\":\"forge://pages\"")));
    }
}
