use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;

use crate::plan::{MoveKind, MoveOperation};
use crate::report::Reporter;

/// Where `TrashMove` sends the file it displaces.
pub trait TrashBin: Sync {
    fn trash(&self, path: &Path) -> Result<()>;
}

/// The platform recycle bin.
pub struct SystemTrash;

impl TrashBin for SystemTrash {
    fn trash(&self, path: &Path) -> Result<()> {
        trash::delete(path)
            .map_err(|err| anyhow!("sending {} to the trash: {err}", path.display()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub moved: usize,
    pub unchanged: usize,
}

/// Starts every move at once and waits for all of them. A failing move does
/// not stop the others; failures are reported together afterwards and
/// nothing already moved is rolled back.
pub fn execute(
    moves: &[MoveOperation],
    trash: &dyn TrashBin,
    reporter: &dyn Reporter,
) -> Result<ExecutionSummary> {
    let pending: Vec<&MoveOperation> = moves
        .iter()
        .filter(|op| op.kind != MoveKind::Unchanged)
        .collect();
    let total = pending.len();
    let completed = Mutex::new(0usize);

    let failures: Vec<String> = pending
        .par_iter()
        .filter_map(|op| {
            let result = apply(op, trash);
            if let Ok(mut done) = completed.lock() {
                *done += 1;
                reporter.progress(*done, total);
            }
            result.err().map(|err| {
                log::debug!("move failed: {err:#}");
                format!("{err:#}")
            })
        })
        .collect();

    if !failures.is_empty() {
        bail!("{}", failures.join("\n"));
    }

    Ok(ExecutionSummary {
        moved: total,
        unchanged: moves.len() - total,
    })
}

fn apply(op: &MoveOperation, trash: &dyn TrashBin) -> Result<()> {
    log::debug!(
        "{:?}: {} -> {}",
        op.kind,
        op.source.display(),
        op.destination.display()
    );
    perform(op, trash)
        .with_context(|| format!("{} -> {}", op.source.display(), op.destination.display()))
}

fn perform(op: &MoveOperation, trash: &dyn TrashBin) -> Result<()> {
    match op.kind {
        MoveKind::Unchanged => Ok(()),
        MoveKind::Rename => {
            fs::rename(&op.source, &op.destination)?;
            Ok(())
        }
        MoveKind::PlainMove => relocate(&op.source, &op.destination, false),
        MoveKind::OverwriteMove => relocate(&op.source, &op.destination, true),
        MoveKind::TrashMove => {
            if fs::symlink_metadata(&op.destination).is_ok() {
                trash.trash(&op.destination)?;
            }
            relocate(&op.source, &op.destination, false)
        }
    }
}

fn relocate(source: &Path, destination: &Path, replace: bool) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    if !replace && fs::symlink_metadata(destination).is_ok() {
        bail!("{} already exists", destination.display());
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => copy_across(source, destination),
        Err(err) => Err(err.into()),
    }
}

/// `rename` cannot cross filesystems; regular files are copied instead.
fn copy_across(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(source)
        .with_context(|| format!("reading metadata for {}", source.display()))?;
    if !metadata.is_file() {
        bail!(
            "{} is not a regular file and cannot be moved across filesystems",
            source.display()
        );
    }
    fs::copy(source, destination).with_context(|| format!("copying to {}", destination.display()))?;
    fs::remove_file(source).with_context(|| format!("removing {}", source.display()))?;
    Ok(())
}
