use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Paths registered with the notification backend.
///
/// The backend is driven in non-recursive mode, so every directory under a
/// root is registered on its own. Missing roots are skipped, never fatal.
pub(super) struct WatchSet {
    roots: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchSet {
    pub(super) fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            attached: FxHashSet::default(),
        }
    }

    /// Register every existing root (directories expanded to their subtrees).
    pub(super) fn attach_all<W: Watcher>(&mut self, watcher: &mut W) {
        for root in self.roots.clone() {
            if !root.exists() {
                crate::debug!("watch"; "skip missing path: {}", root.display());
                continue;
            }
            if root.is_dir() {
                self.attach_tree(watcher, &root);
            } else {
                self.attach_one(watcher, &root);
            }
        }
    }

    /// Register `dir` and every directory below it. Returns how many were new.
    pub(super) fn attach_tree<W: Watcher>(&mut self, watcher: &mut W, dir: &Path) -> usize {
        let mut added = 0;
        for entry in jwalk::WalkDir::new(dir).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    if self.attach_one(watcher, &entry.path()) {
                        added += 1;
                    }
                }
                Ok(_) => {}
                // Directory vanished mid-walk
                Err(e) => crate::debug!("watch"; "walk error: {}", e),
            }
        }
        added
    }

    fn attach_one<W: Watcher>(&mut self, watcher: &mut W, path: &Path) -> bool {
        if self.attached.contains(path) {
            return false;
        }
        match watcher.watch(path, RecursiveMode::NonRecursive) {
            Ok(()) => {
                self.attached.insert(path.to_path_buf());
                true
            }
            Err(e) => {
                crate::log!("watch"; "cannot watch {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Forget `path` and everything registered below it. Returns how many
    /// were dropped.
    ///
    /// The backend may already have dropped its own watch on a deleted
    /// path, so `unwatch` failures are ignored.
    pub(super) fn detach<W: Watcher>(&mut self, watcher: &mut W, path: &Path) -> usize {
        let gone: Vec<PathBuf> = self
            .attached
            .iter()
            .filter(|attached| attached.starts_with(path))
            .cloned()
            .collect();
        for attached in &gone {
            let _ = watcher.unwatch(attached);
            self.attached.remove(attached);
        }
        gone.len()
    }

    /// Register a path that (re)appeared: a directory with its subtree, or a
    /// file that is itself a root. Other files are covered by their parent.
    pub(super) fn reattach<W: Watcher>(&mut self, watcher: &mut W, path: &Path) -> usize {
        if path.is_dir() {
            self.attach_tree(watcher, path)
        } else if path.exists() && self.roots.iter().any(|root| root == path) {
            usize::from(self.attach_one(watcher, path))
        } else {
            0
        }
    }

    pub(super) fn len(&self) -> usize {
        self.attached.len()
    }

    #[cfg(test)]
    pub(super) fn contains(&self, path: &Path) -> bool {
        self.attached.contains(path)
    }
}
