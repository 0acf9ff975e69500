//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request path to a file under `root`.
///
/// Tried in order:
/// 1. the path itself, if it is a file
/// 2. `<path>/index.html`, if the path is a directory
/// 3. `<path>.html`
/// 4. `<path>/index.html`, even if `<path>` is not a directory
///
/// Returns `None` when nothing matches or the path would leave `root`.
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let clean = clean_path(url_path)?;
    let candidate = find_candidate(root, &clean)?;

    // Symlinks may still point outside the root
    let canonical = candidate.canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    canonical.starts_with(&root_canonical).then_some(canonical)
}

fn find_candidate(root: &Path, clean: &str) -> Option<PathBuf> {
    let local = if clean.is_empty() {
        root.to_path_buf()
    } else {
        root.join(clean)
    };

    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    if local.is_dir() && index.is_file() {
        return Some(index);
    }
    if !clean.is_empty() {
        let html = root.join(format!("{clean}.html"));
        if html.is_file() {
            return Some(html);
        }
    }
    index.is_file().then_some(index)
}

/// Percent-decode and lexically clean a URL path into a relative path.
///
/// `.` segments and empty segments are dropped, `..` pops the previous
/// segment. Returns `None` if `..` would climb above the root or the path
/// contains characters that are never valid in a served file name.
pub fn clean_path(url_path: &str) -> Option<String> {
    let path = url_path.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains(['\0', '\\']) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}
