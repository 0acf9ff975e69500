//! `forge build`.

use anyhow::Result;

use crate::build::{Build, SiteBuilder};
use crate::config::SiteConfig;

/// Build the site once, failing the process on error.
pub fn build_site(config: &SiteConfig) -> Result<()> {
    let result = SiteBuilder::new(&config.config_path).build();
    if let Some(err) = result.error {
        return Err(err.context("build failed"));
    }
    crate::log!(
        "build";
        "{} pages in {:.0?} -> {}",
        result.pages,
        result.duration,
        config.build.output.display()
    );
    if result.pages == 0 {
        crate::log!("build"; "no pages found in {}", config.build.content.display());
    }
    Ok(())
}
