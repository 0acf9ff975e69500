//! Server lifecycle: port binding and in-flight request tracking.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::ServeError;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
///
/// `bind` is tried on `base_port` and the ports after it.
pub fn bind_with_retry<T>(
    interface: IpAddr,
    base_port: u16,
    bind: impl Fn(SocketAddr) -> io::Result<T>,
) -> Result<T, ServeError> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match bind(SocketAddr::new(interface, port)) {
            Ok(bound) => {
                if offset > 0 {
                    crate::log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok(bound);
            }
            Err(e) => last_error = Some(e),
        }
        // Ephemeral port requested: retrying cannot help
        if base_port == 0 {
            break;
        }
    }

    Err(ServeError::Bind {
        first: base_port,
        last: base_port.saturating_add(MAX_PORT_RETRIES - 1),
        source: last_error.unwrap_or_else(|| io::Error::other("no port attempted")),
    })
}

/// Number of requests being answered.
#[derive(Default)]
pub struct InFlight(Arc<AtomicUsize>);

/// Marks one request as in flight until dropped.
pub struct RequestGuard(Arc<AtomicUsize>);

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl InFlight {
    pub fn begin(&self) -> RequestGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        RequestGuard(Arc::clone(&self.0))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Wait until no request is in flight, or `grace` has passed.
    ///
    /// Returns `true` if the server went idle in time.
    pub fn wait_idle(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        while self.count() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }
}
