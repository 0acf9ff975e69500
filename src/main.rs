//! forge - Markdown sites with a live-reloading dev server and an agent protocol.

mod agent;
mod build;
mod cli;
mod config;
mod context;
mod coordinator;
mod core;
mod embed;
mod hub;
mod logger;
mod page;
mod server;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    // stdout belongs to the protocol in agent mode
    if matches!(cli.command, Commands::Agent) {
        logger::use_stderr();
    }

    let mut config = SiteConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        Commands::Build => cli::build::build_site(&config),
        Commands::Serve { .. } => cli::serve::serve_site(&config),
        Commands::Agent => cli::agent::run_agent(&config),
    }
}
