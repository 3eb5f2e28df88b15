use crate::entry::Entry;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use treediff_common::Result;

/// Per-side visited sets of canonical paths, scoped to one comparison run.
///
/// Each recursion level descends with its own clone, so sibling branches
/// never observe each other's marks while ancestor marks stay visible.
#[derive(Debug, Clone, Default)]
pub struct SymlinkCache {
    pub left: HashSet<PathBuf>,
    pub right: HashSet<PathBuf>,
}

/// Returns true if `entry` is a symlink whose resolved real path has already
/// been visited on this branch. Lookups are always keyed by the canonical
/// path, so the same physical directory reached through different links is
/// still caught.
pub fn detect_loop(entry: Option<&Entry>, visited: &HashSet<PathBuf>) -> Result<bool> {
    if let Some(entry) = entry {
        if entry.is_symlink {
            let real_path = fs::canonicalize(&entry.absolute_path)?;
            return Ok(visited.contains(&real_path));
        }
    }
    Ok(false)
}

/// The key under which `entry` is marked visited before descending.
pub fn visited_key(entry: &Entry) -> Result<PathBuf> {
    if entry.is_symlink {
        Ok(fs::canonicalize(&entry.absolute_path)?)
    } else {
        Ok(entry.absolute_path.clone())
    }
}
