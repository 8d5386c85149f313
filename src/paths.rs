use std::path::{Component, Path, PathBuf};

/// Windows and macOS volumes fold letter case by default.
pub const CASE_INSENSITIVE: bool = cfg!(any(windows, target_os = "macos"));

/// Lexically normalizes `path`: drops `.` and lets `..` pop one component.
/// Never touches the filesystem, so it works for paths that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Resolves `path` against `root` when relative and normalizes the result.
pub fn resolve(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&root.join(path))
    }
}

/// Key used whenever two paths are compared for identity.
pub fn comparison_key(path: &Path) -> PathBuf {
    if CASE_INSENSITIVE {
        PathBuf::from(lowercase(path))
    } else {
        path.to_path_buf()
    }
}

/// True when `path` is `root` itself or lies below it.
pub fn is_inside_root(path: &Path, root: &Path) -> bool {
    let root = comparison_key(&normalize(root));
    let candidate = comparison_key(&resolve(path, &root));
    candidate.starts_with(&root)
}

/// Like [`is_inside_root`] but excludes `root` itself. Cleanup uses this so
/// the working directory is never removed.
pub fn is_strict_child(path: &Path, root: &Path) -> bool {
    let root = comparison_key(&normalize(root));
    let candidate = comparison_key(&resolve(path, &root));
    candidate != root && candidate.starts_with(&root)
}

/// Both paths must already be resolved. Holds when the destination differs
/// from the source only in the letter case of its file name.
pub fn is_case_only_rename(old: &Path, new: &Path) -> bool {
    old.parent() == new.parent()
        && old.file_name() != new.file_name()
        && lowercase(old) == lowercase(new)
}

/// Longest shared leading component sequence of `paths`.
pub fn common_ancestor<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let mut common: Vec<Component<'a>> = iter.next()?.components().collect();
    for path in iter {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(left, right)| **left == *right)
            .count();
        common.truncate(shared);
    }

    if common.is_empty() {
        None
    } else {
        Some(common.iter().collect())
    }
}

fn lowercase(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
