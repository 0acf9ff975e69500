//! `forge agent`: JSON-RPC over stdio with change notifications.

use std::io;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

use crate::agent::{Agent, Notifier};
use crate::config::SiteConfig;
use crate::context::{FsSource, SiteContext};
use crate::coordinator;
use crate::watch::Watcher;

pub fn run_agent(config: &SiteConfig) -> Result<()> {
    let context = Arc::new(SiteContext::new(FsSource, &config.config_path));
    let notifier = Notifier::stdout();

    let (watcher, changes) = Watcher::channel(config.watch_paths(), config.serve.debounce());
    let watcher = Arc::new(watcher);
    coordinator::agent::spawn(changes, Arc::clone(&context), notifier.clone())
        .context("failed to start invalidation thread")?;

    let background = Arc::clone(&watcher);
    thread::Builder::new()
        .name("watcher".into())
        .spawn(move || {
            if let Err(e) = background.start() {
                crate::log!("error"; "watcher stopped: {}", e);
            }
        })
        .context("failed to start watcher thread")?;

    crate::log!("agent"; "ready on stdio ({})", config.config_path.display());
    let result = Agent::new(context, notifier).run(io::stdin().lock());
    watcher.stop();
    result.context("stdio closed with an error")
}
