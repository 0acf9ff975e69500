//! Dev-server wiring: rebuild and broadcast.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Receiver;

use crate::build::{Build, BuildResult};
use crate::hub::{Hub, RELOAD};
use crate::logger::{status_error, status_success};

/// Rebuild on every change signal until the channel closes.
pub fn spawn(
    changes: Receiver<()>,
    builder: Arc<dyn Build>,
    hub: Arc<Hub>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("rebuild".into()).spawn(move || {
        for () in changes.iter() {
            if crate::core::is_shutdown() {
                break;
            }
            rebuild(builder.as_ref(), &hub);
        }
    })
}

/// Build once, report the outcome and broadcast a reload.
///
/// The reload goes out even when the build failed; browsers then show the
/// previous output again, which is still being served.
pub fn rebuild(builder: &dyn Build, hub: &Hub) -> BuildResult {
    let result = builder.build();
    report(&result);
    if hub.broadcast(RELOAD) {
        crate::debug!("hub"; "reload queued for {} client(s)", hub.client_count());
    }
    result
}

pub fn report(result: &BuildResult) {
    match &result.error {
        None => status_success(&format!(
            "built {} {} in {:.0?}",
            result.pages,
            if result.pages == 1 { "page" } else { "pages" },
            result.duration
        )),
        Some(err) => status_error("build failed", &format!("{err:#}")),
    }
}
