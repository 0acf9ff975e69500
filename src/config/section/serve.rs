//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5277                 # HTTP port number
//! ws_port = 35729             # Live-reload WebSocket port
//! watch = true                # Rebuild on file changes
//! live_reload = true          # Inject the reload script into HTML
//! csp_nonce = false           # Tag inline scripts with a per-response nonce
//! debounce_ms = 300           # Quiet period before a rebuild
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Live-reload WebSocket port. The next free port is used if taken.
    pub ws_port: u16,

    /// Enable file watcher.
    pub watch: bool,

    /// Inject the live-reload script into HTML responses.
    pub live_reload: bool,

    /// Use Content-Security-Policy nonces for inline scripts.
    pub csp_nonce: bool,

    /// Debounce window for file changes, in milliseconds.
    pub debounce_ms: u64,
}

impl ServeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            ws_port: 35729,
            watch: true,
            live_reload: true,
            csp_nonce: false,
            debounce_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nws_port = 9000\nwatch = false\ncsp_nonce = true",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.ws_port, 9000);
        assert!(!config.serve.watch);
        assert!(config.serve.csp_nonce);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 5277);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.watch);
        assert!(config.serve.live_reload);
        assert!(!config.serve.csp_nonce);
        assert_eq!(config.serve.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_serve_config_partial_override() {
        let config = test_parse_config("[serve]\nlive_reload = false\ndebounce_ms = 50");

        assert!(!config.serve.live_reload);
        assert_eq!(config.serve.debounce(), Duration::from_millis(50));
        // port uses default
        assert_eq!(config.serve.port, 5277);
    }
}
