//! `[site]` section configuration.
//!
//! ```toml
//! [site]
//! title = "My Notes"
//! url = "https://example.com"
//! ```

use serde::{Deserialize, Serialize};

/// Site metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    /// Site title, used as the `<title>` suffix of rendered pages.
    pub title: String,

    /// Public URL of the deployed site.
    pub url: Option<String>,
}
