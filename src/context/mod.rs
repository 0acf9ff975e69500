//! Lazily loaded, invalidation-driven site snapshot.
//!
//! Staleness is a generation counter rather than a boolean so that
//! [`SiteContext::mark_dirty`] never waits on the lock:
//!
//! ```text
//! mark_dirty()  generation += 1            (atomic, lock-free)
//! load()        wanted = generation
//!               lock
//!               covered >= wanted ? cached outcome : reload
//! ```
//!
//! A reload records the generation it observed before doing I/O as
//! `covered`, so every caller that was waiting on the lock gets the same
//! `Arc<Site>` or the same error without triggering another reload.

mod source;


use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::page::Page;

pub use source::{FsSource, SiteSource};

/// An immutable, fully loaded view of the site.
#[derive(Debug)]
pub struct Site {
    pub config: SiteConfig,
    pub pages: Vec<Page>,
    pub loaded_at: SystemTime,
}

/// Read accessors. A snapshot never changes once published, so callers
/// holding one `Arc<Site>` always see a consistent view.
impl Site {
    /// Every tag used by the pages, sorted and deduplicated.
    pub(crate) fn tags(&self) -> Vec<String> {
        collect_sorted(self.pages.iter().flat_map(|p| p.tags.iter()))
    }

    pub(crate) fn categories(&self) -> Vec<String> {
        collect_sorted(self.pages.iter().flat_map(|p| p.categories.iter()))
    }

    pub(crate) fn sections(&self) -> Vec<String> {
        collect_sorted(self.pages.iter().filter_map(|p| p.section.as_ref()))
    }

    /// Pages belonging to `name`, in source order.
    pub(crate) fn section_pages(&self, name: &str) -> Vec<Page> {
        self.pages
            .iter()
            .filter(|p| p.section.as_deref() == Some(name))
            .cloned()
            .collect()
    }
}

fn collect_sorted<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    items
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// A failed reload, shared by every caller that waited on it.
#[derive(Debug, Clone, Error)]
#[error("failed to load site: {0:#}")]
pub struct LoadError(Arc<anyhow::Error>);

impl LoadError {
    #[cfg(test)]
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

enum Outcome {
    Empty,
    Ready(Arc<Site>),
    Failed(LoadError),
}

struct State {
    outcome: Outcome,
    /// Highest generation the current outcome accounts for
    covered: u64,
}

/// Cached site snapshot, reloaded on demand after [`SiteContext::mark_dirty`].
pub struct SiteContext {
    source: Box<dyn SiteSource>,
    config_path: PathBuf,
    /// Bumped on every invalidation; starts ahead of `covered` (stale)
    generation: AtomicU64,
    state: RwLock<State>,
}

impl SiteContext {
    pub fn new(source: impl SiteSource + 'static, config_path: impl Into<PathBuf>) -> Self {
        Self {
            source: Box::new(source),
            config_path: config_path.into(),
            generation: AtomicU64::new(1),
            state: RwLock::new(State {
                outcome: Outcome::Empty,
                covered: 0,
            }),
        }
    }

    /// Return the current snapshot, reloading first if it is stale.
    ///
    /// Concurrent callers are serialized on the write lock; at most one
    /// reload is in flight and everyone who waited for it shares its result.
    pub fn load(&self) -> Result<Arc<Site>, LoadError> {
        let wanted = self.generation.load(Ordering::Acquire);
        let mut state = self.state.write();

        if state.covered >= wanted {
            match &state.outcome {
                Outcome::Ready(site) => return Ok(Arc::clone(site)),
                Outcome::Failed(err) => return Err(err.clone()),
                Outcome::Empty => {}
            }
        }

        let observed = self.generation.load(Ordering::Acquire);
        state.covered = observed;
        match self.reload() {
            Ok(site) => {
                let site = Arc::new(site);
                crate::debug!("agent"; "loaded {} pages", site.pages.len());
                state.outcome = Outcome::Ready(Arc::clone(&site));
                Ok(site)
            }
            Err(err) => {
                let err = LoadError(Arc::new(err));
                state.outcome = Outcome::Failed(err.clone());
                // Later callers retry instead of reading the cached failure
                self.generation.fetch_add(1, Ordering::AcqRel);
                Err(err)
            }
        }
    }

    fn reload(&self) -> anyhow::Result<Site> {
        let config = self.source.load_config(&self.config_path)?;
        let pages = self.source.discover(&config.build.content, &config)?;
        Ok(Site {
            config,
            pages,
            loaded_at: SystemTime::now(),
        })
    }

    /// Mark the snapshot stale. Never blocks and never performs I/O.
    pub fn mark_dirty(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether the next [`SiteContext::load`] will reload.
    pub fn is_dirty(&self) -> bool {
        let wanted = self.generation.load(Ordering::Acquire);
        self.state.read().covered < wanted
    }
}
