use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Options;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Source and destination are the same path.
    Unchanged,
    /// Letter-case change of the file name in place.
    Rename,
    /// Destination exists and the user agreed to replace it.
    OverwriteMove,
    /// Existing destination goes to the trash before the move.
    TrashMove,
    PlainMove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MoveKind,
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Rejected(Vec<String>),
    Accepted {
        moves: Vec<MoveOperation>,
        overwrite_confirmations: Vec<PathBuf>,
    },
}

/// First line that claimed a destination.
#[derive(Debug, Clone)]
struct PathRecord<'a> {
    path: &'a str,
    line: usize,
}

/// A line that passed every check that only needs the line itself.
#[derive(Debug)]
struct ClassifiedLine<'a> {
    index: usize,
    old: &'a str,
    new: &'a str,
    source: PathBuf,
    destination: PathBuf,
    destination_exists: bool,
    case_rename: bool,
}

/// Checks the edited list against the original one and turns it into move
/// operations. Every problem found is reported; nothing is built unless the
/// whole list is valid.
pub fn validate(
    old_files: &[String],
    new_files: &[String],
    options: &Options,
    root: &Path,
) -> ValidationOutcome {
    if old_files.len() != new_files.len() {
        return ValidationOutcome::Rejected(vec![format!(
            "edited file paths do not match the length of the original list. Expected {}, got {}.",
            old_files.len(),
            new_files.len()
        )]);
    }

    let root = paths::normalize(root);
    let mut errors: Vec<Option<String>> = vec![None; old_files.len()];
    let mut classified = Vec::with_capacity(old_files.len());

    for (index, (old, new)) in old_files.iter().zip(new_files).enumerate() {
        match classify_line(index, old, new, options, &root) {
            Ok(line) => classified.push(line),
            Err(message) => errors[index] = Some(message),
        }
    }

    check_batch_conflicts(old_files, &classified, &root, &mut errors);

    let errors: Vec<String> = errors.into_iter().flatten().collect();
    if !errors.is_empty() {
        log::debug!("validation rejected {} line(s)", errors.len());
        return ValidationOutcome::Rejected(errors);
    }

    let mut overwrite_confirmations = Vec::new();
    let moves = classified
        .into_iter()
        .map(|line| {
            let kind = if line.source == line.destination {
                MoveKind::Unchanged
            } else if line.case_rename {
                MoveKind::Rename
            } else if options.trash {
                MoveKind::TrashMove
            } else if options.overwrite && line.destination_exists {
                overwrite_confirmations.push(line.destination.clone());
                MoveKind::OverwriteMove
            } else {
                MoveKind::PlainMove
            };
            MoveOperation {
                source: line.source,
                destination: line.destination,
                kind,
            }
        })
        .collect();

    ValidationOutcome::Accepted {
        moves,
        overwrite_confirmations,
    }
}

fn classify_line<'a>(
    index: usize,
    old: &'a str,
    new: &'a str,
    options: &Options,
    root: &Path,
) -> Result<ClassifiedLine<'a>, String> {
    if new.trim().is_empty() {
        return Err(format!(
            "you must provide a destination for file on line {}.",
            index + 1
        ));
    }

    let source = paths::resolve(Path::new(old), root);
    if !occupied(&source) {
        return Err(format!("cannot read/write {old}."));
    }
    if !paths::is_inside_root(&source, root) {
        return Err(outside_root("existing", old));
    }

    let destination = paths::resolve(Path::new(new), root);
    if !paths::is_inside_root(&destination, root) {
        return Err(outside_root("new", new));
    }

    let destination_exists = occupied(&destination);
    let case_rename = destination_exists
        && paths::is_case_only_rename(&source, &destination)
        && same_file(&source, &destination);
    if case_rename && !options.overwrite {
        return Err(format!(
            "cannot overwrite {new} with the same file in a different case. \
             Please use the `overwrite` flag to perform this action."
        ));
    }

    if !case_rename
        && source != destination
        && destination_exists
        && !options.overwrite
        && !options.trash
    {
        return Err(format!("file {new} already exists."));
    }

    Ok(ClassifiedLine {
        index,
        old,
        new,
        source,
        destination,
        destination_exists,
        case_rename,
    })
}

/// Duplicate sources, duplicate destinations and destinations that are
/// themselves being moved away can only be seen across lines.
fn check_batch_conflicts(
    old_files: &[String],
    classified: &[ClassifiedLine<'_>],
    root: &Path,
    errors: &mut [Option<String>],
) {
    let sources: HashMap<PathBuf, usize> = old_files
        .iter()
        .enumerate()
        .map(|(index, old)| {
            let key = paths::comparison_key(&paths::resolve(Path::new(old), root));
            (key, index)
        })
        .collect();
    let mut seen_sources: HashMap<PathBuf, PathRecord<'_>> = HashMap::new();
    let mut seen: HashMap<PathBuf, PathRecord<'_>> = HashMap::new();

    for line in classified {
        let source_key = paths::comparison_key(&line.source);
        if let Some(first) = seen_sources.get(&source_key) {
            errors[line.index] = Some(format!(
                "existing file {} declared twice on line {} and {}.",
                first.path,
                first.line + 1,
                line.index + 1
            ));
            continue;
        }
        seen_sources.insert(
            source_key,
            PathRecord {
                path: line.old,
                line: line.index,
            },
        );

        let key = paths::comparison_key(&line.destination);

        if let Some(first) = seen.get(&key) {
            errors[line.index] = Some(format!(
                "file {} declared twice on line {} and {}.",
                first.path,
                first.line + 1,
                line.index + 1
            ));
            continue;
        }

        if line.source != line.destination {
            if let Some(&other) = sources.get(&key) {
                if other != line.index {
                    errors[line.index] = Some(format!(
                        "cannot rename {} to {} because the new file is also pending movement.",
                        line.old, line.new
                    ));
                }
            }
        }

        seen.insert(
            key,
            PathRecord {
                path: line.new,
                line: line.index,
            },
        );
    }
}

fn outside_root(label: &str, path: &str) -> String {
    format!(
        "{label} file {path} must be a child of the working directory. \
         Please start imv in the directory you want to use it."
    )
}

/// Dangling symlinks still occupy their name.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// On a case-sensitive volume `foo.js` and `Foo.js` can be two files; only
/// the same inode under both spellings is a case-only rename.
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_a: &Path, _b: &Path) -> bool {
    paths::CASE_INSENSITIVE
}
