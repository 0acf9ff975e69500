//! Site builder: Markdown pages to `<output>/<url>/index.html`.
//!
//! Phases:
//! - **Load** - Re-read `forge.toml` so config edits apply on rebuild
//! - **Collect** - Discover pages under the content directory
//! - **Render** - Parallel Markdown rendering into the page shell
//! - **Static** - Copy the static directory verbatim

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pulldown_cmark::{Options, Parser, html};
use rayon::prelude::*;

use crate::config::SiteConfig;
use crate::embed::build::{PAGE_HTML, PageVars};
use crate::page::{self, Page};
use crate::utils::html::escape;

/// Outcome of one build. A failed build still reports its duration.
#[derive(Debug)]
pub struct BuildResult {
    pub pages: usize,
    pub duration: Duration,
    pub error: Option<anyhow::Error>,
}

impl BuildResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Something that can (re)build the site on demand.
pub trait Build: Send + Sync {
    fn build(&self) -> BuildResult;
}

/// Builds from a config file on disk.
pub struct SiteBuilder {
    config_path: PathBuf,
}

impl SiteBuilder {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    fn run(&self) -> Result<usize> {
        let config = SiteConfig::load(&self.config_path)?;
        let pages = page::discover(&config.build.content, &config)?;

        fs::create_dir_all(&config.build.output).with_context(|| {
            format!("failed to create {}", config.build.output.display())
        })?;

        pages
            .par_iter()
            .try_for_each(|page| write_page(&config, page))?;

        let copied = copy_static(&config.build.static_dir, &config.build.output)?;
        crate::debug!("build"; "{} pages, {} static files", pages.len(), copied);
        Ok(pages.len())
    }
}

impl Build for SiteBuilder {
    fn build(&self) -> BuildResult {
        let started = Instant::now();
        let result = self.run();
        let duration = started.elapsed();
        match result {
            Ok(pages) => BuildResult {
                pages,
                duration,
                error: None,
            },
            Err(error) => BuildResult {
                pages: 0,
                duration,
                error: Some(error),
            },
        }
    }
}

/// Render Markdown to an HTML fragment.
pub fn render_markdown(source: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(source, options));
    out
}

fn render_page(config: &SiteConfig, page: &Page) -> String {
    let title = if config.site.title.is_empty() || page.url == "/" {
        page.title.clone()
    } else {
        format!("{} | {}", page.title, config.site.title)
    };
    PAGE_HTML.render(&PageVars {
        title: escape(&title).into_owned(),
        content: render_markdown(&page.body),
    })
}

/// Output file for a clean URL: `/blog/x/` -> `<output>/blog/x/index.html`.
pub fn output_path(output: &Path, url: &str) -> PathBuf {
    let relative = url.trim_matches('/');
    let dir = if relative.is_empty() {
        output.to_path_buf()
    } else {
        output.join(relative)
    };
    dir.join("index.html")
}

fn write_page(config: &SiteConfig, page: &Page) -> Result<()> {
    let path = output_path(&config.build.output, &page.url);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render_page(config, page))
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Copy `src` into `dest` recursively. Missing `src` is not an error.
fn copy_static(src: &Path, dest: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in jwalk::WalkDir::new(src) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(src).unwrap_or(path.as_path());
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&path, &target).with_context(|| {
            format!("failed to copy {} to {}", path.display(), target.display())
        })?;
        count += 1;
    }
    Ok(count)
}
