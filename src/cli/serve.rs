//! `forge serve`: build, then serve with live reload.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::build::{Build, SiteBuilder};
use crate::config::SiteConfig;
use crate::coordinator::dev;
use crate::core::shutdown_signal;
use crate::hub::Hub;
use crate::server::{Server, ServerOptions};
use crate::watch::Watcher;

pub fn serve_site(config: &SiteConfig) -> Result<()> {
    let builder: Arc<dyn Build> = Arc::new(SiteBuilder::new(&config.config_path));
    dev::report(&builder.build());

    let hub = Arc::new(Hub::new());
    let mut server = Server::new(ServerOptions::from_config(config), Arc::clone(&hub));

    if config.serve.watch {
        let (watcher, changes) = Watcher::channel(config.watch_paths(), config.serve.debounce());
        dev::spawn(changes, builder, hub).context("failed to start rebuild thread")?;
        server = server.with_watcher(Arc::new(watcher));
    }

    let server = Arc::new(server);
    server.start(shutdown_signal())?;
    Ok(())
}
