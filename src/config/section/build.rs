//! `[build]` section configuration.
//!
//! ```toml
//! [build]
//! content = "content"   # Markdown sources
//! output = "public"     # Rendered site
//! static = "static"     # Copied verbatim into output
//! drafts = false        # Include pages marked `draft = true`
//! ```
//!
//! Relative paths are resolved against the directory holding `forge.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Build paths and content options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Content directory.
    pub content: PathBuf,

    /// Output directory, owned by the build.
    pub output: PathBuf,

    /// Static files directory.
    #[serde(rename = "static")]
    pub static_dir: PathBuf,

    /// Include draft pages.
    pub drafts: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content: "content".into(),
            output: "public".into(),
            static_dir: "static".into(),
            drafts: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::config::test_parse_config;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.content, Path::new("/site/content"));
        assert_eq!(config.build.output, Path::new("/site/public"));
        assert_eq!(config.build.static_dir, Path::new("/site/static"));
        assert!(!config.build.drafts);
    }

    #[test]
    fn test_build_config_static_rename() {
        let config = test_parse_config("[build]\nstatic = \"assets\"\ndrafts = true");
        assert_eq!(config.build.static_dir, Path::new("/site/assets"));
        assert!(config.build.drafts);
    }

    #[test]
    fn test_build_config_absolute_path_kept() {
        let config = test_parse_config("[build]\noutput = \"/var/www/site\"");
        assert_eq!(config.build.output, Path::new("/var/www/site"));
    }
}
