//! Collaborators that materialize a site snapshot.

use std::path::Path;

use anyhow::Result;

use crate::config::SiteConfig;
use crate::page::{self, Page};

/// Config loader and content discovery, bundled for [`super::SiteContext`].
pub trait SiteSource: Send + Sync {
    fn load_config(&self, path: &Path) -> Result<SiteConfig>;
    fn discover(&self, content_root: &Path, config: &SiteConfig) -> Result<Vec<Page>>;
}

/// Reads `forge.toml` and the content tree from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl SiteSource for FsSource {
    fn load_config(&self, path: &Path) -> Result<SiteConfig> {
        Ok(SiteConfig::load(path)?)
    }

    fn discover(&self, content_root: &Path, config: &SiteConfig) -> Result<Vec<Page>> {
        page::discover(content_root, config)
    }
}
