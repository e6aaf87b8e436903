//! Finding vendored libffi source trees in Buildozer caches

use std::fs;
use std::path::{Path, PathBuf};

use crate::patch_system::CONFIGURE_AC;

pub const BUILDOZER_DIR: &str = ".buildozer";
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// `<project>/.buildozer` and `~/.buildozer`
pub fn default_search_roots(project_dir: &Path) -> Vec<PathBuf> {
    let mut roots = vec![project_dir.join(BUILDOZER_DIR)];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(BUILDOZER_DIR));
    }
    roots
}

fn is_libffi_tree(dir: &Path) -> bool {
    let named_libffi = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with("libffi"));

    named_libffi && dir.join(CONFIGURE_AC).is_file()
}

fn find_trees_recursive(dir: &Path, depth: usize, max_depth: usize, found: &mut Vec<PathBuf>) {
    if is_libffi_tree(dir) {
        found.push(dir.to_path_buf());
        return;
    }
    if depth >= max_depth {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        // file_type() does not follow symlinks
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            find_trees_recursive(&entry.path(), depth + 1, max_depth, found);
        }
    }
}

/// All libffi source trees below `roots`, sorted and deduplicated.
/// Missing roots are skipped.
pub fn locate_sources(roots: &[PathBuf], max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for root in roots {
        if !root.is_dir() {
            log::debug!("Search root {} does not exist", root.display());
            continue;
        }
        find_trees_recursive(root, 0, max_depth, &mut found);
    }

    found.sort();
    found.dedup();

    log::info!("Found {} libffi source tree(s)", found.len());
    for tree in &found {
        log::debug!("  {}", tree.display());
    }
    found
}
