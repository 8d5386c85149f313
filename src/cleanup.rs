use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::paths;

/// Removes directories left empty by a move batch.
///
/// Only the tree below the common ancestor of `affected` is visited, the
/// root itself and hidden directories are never touched, and failures are
/// logged rather than returned.
pub fn prune_empty_dirs(affected: &[PathBuf], root: &Path) -> Vec<PathBuf> {
    let base = cleanup_base(affected, root);
    log::debug!("pruning empty directories under {}", base.display());

    let mut candidates: Vec<(usize, PathBuf)> = WalkDir::new(&base)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("cleanup skipped an entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| (entry.depth(), entry.into_path()))
        .collect();

    // Deepest first so a parent can become empty once its children are gone.
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = Vec::new();
    for (_, dir) in candidates {
        if !paths::is_strict_child(&dir, root) || !is_empty_dir(&dir) {
            continue;
        }
        match fs::remove_dir(&dir) {
            Ok(()) => removed.push(dir),
            Err(err) => log::warn!("could not remove {}: {err}", dir.display()),
        }
    }
    removed
}

fn cleanup_base(affected: &[PathBuf], root: &Path) -> PathBuf {
    let parents = affected.iter().filter_map(|path| path.parent());
    match paths::common_ancestor(parents) {
        Some(dir) if paths::is_inside_root(&dir, root) && dir.is_dir() => dir,
        _ => root.to_path_buf(),
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removes_emptied_directories_bottom_up() {
        let temp = tempdir().expect("temp dir");
        let root = temp.path();
        fs::create_dir_all(root.join("bar/deep/deeper")).expect("create dirs");
        fs::create_dir_all(root.join("new_folder")).expect("create dirs");
        fs::write(root.join("new_folder/opera.doc"), "pump").expect("write fixture");

        let removed = prune_empty_dirs(
            &[root.join("bar/deep/deeper/opera.doc"), root.join("new_folder/opera.doc")],
            root,
        );

        assert_eq!(removed.len(), 3);
        assert!(!root.join("bar").exists());
        assert!(root.join("new_folder/opera.doc").exists());
        assert!(root.exists());
    }

    #[test]
    fn keeps_root_hidden_and_populated_directories() {
        let temp = tempdir().expect("temp dir");
        let root = temp.path().join("project");
        fs::create_dir_all(root.join(".git/refs/tags")).expect("create dirs");
        fs::create_dir_all(root.join("full")).expect("create dirs");
        fs::write(root.join("full/file.txt"), "x").expect("write fixture");

        let removed = prune_empty_dirs(&[root.join("a.txt"), root.join("b.txt")], &root);

        assert!(removed.is_empty());
        assert!(root.join(".git/refs/tags").exists());
        assert!(root.join("full").exists());
        assert!(root.exists());
    }

    #[test]
    fn base_is_the_common_ancestor_inside_root() {
        let temp = tempdir().expect("temp dir");
        let root = temp.path();
        fs::create_dir_all(root.join("bar/sub")).expect("create dirs");

        assert_eq!(
            cleanup_base(&[root.join("bar/sub/a.txt"), root.join("bar/b.txt")], root),
            root.join("bar")
        );
        assert_eq!(
            cleanup_base(&[root.join("bar/a.txt"), PathBuf::from("/elsewhere/b.txt")], root),
            root.to_path_buf()
        );
    }
}
