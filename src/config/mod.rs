//! Site configuration management for `forge.toml`.
//!
//! # Sections
//!
//! | Section   | Purpose                                        |
//! |-----------|------------------------------------------------|
//! | `[site]`  | Site metadata (title, url)                     |
//! | `[build]` | Content, output and static paths, drafts       |
//! | `[serve]` | Dev server (interface, port, watch, reload)    |

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{BuildConfig, ServeConfig, SiteInfo};

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "forge.toml";

/// Root configuration structure representing forge.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Site metadata
    #[serde(default)]
    pub site: SiteInfo,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration from a file, resolving paths against its directory.
    ///
    /// Unknown fields are reported and ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |err| ConfigError::Io(path.to_path_buf(), err);
        let path = &std::path::absolute(path).map_err(io_error)?;
        let content = fs::read_to_string(path).map_err(io_error)?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            crate::log!("config"; "ignoring unknown fields in {}: {}", path.display(), ignored.join(", "));
        }

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = path.to_path_buf();
        config.set_root(&root);
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Set the project root and make build paths absolute under it.
    pub fn set_root(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        for path in [
            &mut self.build.content,
            &mut self.build.output,
            &mut self.build.static_dir,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }

    /// Paths whose changes affect the rendered site.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        vec![
            self.build.content.clone(),
            self.build.static_dir.clone(),
            self.config_path.clone(),
        ]
    }
}

/// Parse a config for tests, rooted at `/site`.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> SiteConfig {
    let config = format!("[site]\ntitle = \"Test\"\n{extra}");
    let (mut parsed, ignored) = SiteConfig::parse_with_ignored(&config).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.set_root(Path::new("/site"));
    parsed
}

// ============================================================================
// tests
// ============================================================================
