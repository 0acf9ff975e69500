//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::SiteConfig;

/// forge: markdown sites with live reload and an agent protocol
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path
    #[arg(short = 'C', long, global = true, default_value = "forge.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site into the output directory
    #[command(visible_alias = "b")]
    Build,

    /// Start development server with live reload
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for auto-rebuild
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Inject the live-reload script into HTML pages
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        live_reload: Option<bool>,
    },

    /// Serve site data to an automation client over stdio (JSON-RPC)
    #[command(visible_alias = "a")]
    Agent,
}

impl Cli {
    /// Apply command-line overrides on top of `forge.toml`.
    pub fn apply_overrides(&self, config: &mut SiteConfig) {
        if let Commands::Serve {
            interface,
            port,
            watch,
            live_reload,
        } = &self.command
        {
            let serve = &mut config.serve;
            if let Some(interface) = interface {
                serve.interface = *interface;
            }
            if let Some(port) = port {
                serve.port = *port;
            }
            if let Some(watch) = watch {
                serve.watch = *watch;
            }
            if let Some(live_reload) = live_reload {
                serve.live_reload = *live_reload;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["forge", "serve", "-p", "8080", "--watch=false", "-l"]);
        let mut config = test_parse_config("[serve]\nlive_reload = false");
        cli.apply_overrides(&mut config);
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.watch);
        assert!(config.serve.live_reload);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["forge", "agent", "--config", "site/forge.toml", "-v"]);
        assert!(matches!(cli.command, Commands::Agent));
        assert_eq!(cli.config, PathBuf::from("site/forge.toml"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_build_leaves_serve_untouched() {
        let cli = Cli::parse_from(["forge", "build"]);
        let mut config = test_parse_config("");
        cli.apply_overrides(&mut config);
        assert_eq!(config.serve.port, 5277);
    }
}
