//! Page records and content discovery.

mod meta;

pub use meta::PageMeta;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::config::SiteConfig;

/// A discovered content page.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Source path relative to the content root
    pub source: PathBuf,
    /// Clean URL, always starting and ending with `/`
    pub url: String,
    pub title: String,
    pub date: Option<String>,
    pub section: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub draft: bool,
    /// Markdown body without front matter
    #[serde(skip)]
    pub body: String,
}

/// Discover every Markdown page under `content_root`, sorted by source path.
///
/// Drafts are skipped unless `build.drafts` is set.
pub fn discover(content_root: &Path, config: &SiteConfig) -> Result<Vec<Page>> {
    if !content_root.is_dir() {
        bail!("content directory `{}` not found", content_root.display());
    }

    let mut pages = Vec::new();
    for entry in jwalk::WalkDir::new(content_root).sort(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", content_root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let page = read_page(content_root, &path)?;
        if page.draft && !config.build.drafts {
            continue;
        }
        pages.push(page);
    }

    pages.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(pages)
}

/// Read and parse one Markdown file.
pub fn read_page(content_root: &Path, path: &Path) -> Result<Page> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (front_matter, body) = meta::split_front_matter(&source);
    let meta = match front_matter {
        Some(fm) => meta::parse(fm)
            .with_context(|| format!("invalid front matter in {}", path.display()))?,
        None => PageMeta::default(),
    };

    let relative = path.strip_prefix(content_root).unwrap_or(path).to_path_buf();
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let section = meta.section.clone().or_else(|| section_of(&relative));

    Ok(Page {
        url: url_for(&relative),
        title: meta.title.unwrap_or(stem),
        date: meta.date,
        section,
        tags: meta.tags,
        categories: meta.categories,
        draft: meta.draft,
        body: body.to_string(),
        source: relative,
    })
}

/// `blog/my-post.md` -> `/blog/my-post/`, `blog/index.md` -> `/blog/`.
pub fn url_for(relative: &Path) -> String {
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(stem) = relative.file_stem().and_then(|s| s.to_str())
        && stem != "index"
    {
        parts.push(stem.to_string());
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}

/// First directory under the content root, if any.
fn section_of(relative: &Path) -> Option<String> {
    let parent = relative.parent()?;
    match parent.components().next()? {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    }
}
