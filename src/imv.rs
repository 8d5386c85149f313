use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cleanup;
use crate::config::Options;
use crate::editor::{self, EditStatus, ListFile};
use crate::execute::{self, ExecutionSummary, TrashBin};
use crate::files;
use crate::plan::{self, MoveKind, MoveOperation, ValidationOutcome};
use crate::report::Reporter;

/// Why a run stopped without moving anything. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NoInput,
    Unchanged,
    Declined,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ExecutionSummary),
    Aborted(AbortReason),
}

impl RunOutcome {
    /// An interrupted editor stops quietly but still signals failure to
    /// scripts.
    pub fn success(&self) -> bool {
        !matches!(self, RunOutcome::Aborted(AbortReason::Interrupted))
    }
}

/// The two points where a run waits on the user.
pub trait Session {
    /// Runs once there is something to edit, before the list file exists.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }
    fn edit(&mut self, list: &Path) -> Result<EditStatus>;
    fn confirm_overwrite(&mut self, destinations: &[PathBuf]) -> Result<bool>;
}

/// Real editor, real terminal. The editor is looked up only when a run
/// actually has files to edit.
pub struct TerminalSession {
    configured: Option<String>,
    editor: Option<String>,
}

impl TerminalSession {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured,
            editor: None,
        }
    }
}

impl Session for TerminalSession {
    fn prepare(&mut self) -> Result<()> {
        if self.editor.is_none() {
            self.editor = Some(editor::resolve_editor(self.configured.as_deref())?);
        }
        Ok(())
    }

    fn edit(&mut self, list: &Path) -> Result<EditStatus> {
        self.prepare()?;
        let editor = self.editor.as_deref().unwrap_or_default();
        editor::launch_editor(editor, list)
    }

    fn confirm_overwrite(&mut self, destinations: &[PathBuf]) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        writeln!(stdout, "The following files will be overwritten:")?;
        for path in destinations {
            writeln!(stdout, "  - {}", path.display())?;
        }
        ask_yes_no(
            &mut stdin.lock(),
            &mut stdout,
            &format!("Overwrite {} file(s)? [y/n]: ", destinations.len()),
        )
    }
}

/// Re-asks until it reads yes or no. End of input counts as no.
fn ask_yes_no(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<bool> {
    loop {
        write!(output, "{question}")?;
        output.flush()?;
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter y or n.")?,
        }
    }
}

pub struct Imv<'a> {
    root: PathBuf,
    options: Options,
    reporter: &'a dyn Reporter,
    trash: &'a dyn TrashBin,
}

impl<'a> Imv<'a> {
    pub fn new(
        root: PathBuf,
        options: Options,
        reporter: &'a dyn Reporter,
        trash: &'a dyn TrashBin,
    ) -> Self {
        Self {
            root,
            options,
            reporter,
            trash,
        }
    }

    /// gather → edit → validate → confirm → execute → cleanup.
    pub fn run(&self, inputs: &[String], session: &mut dyn Session) -> Result<RunOutcome> {
        self.options.check()?;

        let old_files = files::resolve_inputs(inputs, &self.options, &self.root)?;
        if old_files.is_empty() {
            self.reporter
                .warn("No files found matching your input. Aborting.");
            return Ok(RunOutcome::Aborted(AbortReason::NoInput));
        }
        log::debug!("editing {} path(s)", old_files.len());

        session.prepare()?;
        let list = ListFile::create(&old_files)?;
        if session.edit(list.path())? == EditStatus::Interrupted {
            log::debug!("editor interrupted");
            return Ok(RunOutcome::Aborted(AbortReason::Interrupted));
        }
        let new_files = list.read_lines()?;

        if new_files == old_files {
            self.reporter.warn("Files unchanged. Aborting.");
            return Ok(RunOutcome::Aborted(AbortReason::Unchanged));
        }

        let (moves, confirmations) =
            match plan::validate(&old_files, &new_files, &self.options, &self.root) {
                ValidationOutcome::Rejected(errors) => bail!("{}", errors.join("\n")),
                ValidationOutcome::Accepted {
                    moves,
                    overwrite_confirmations,
                } => (moves, overwrite_confirmations),
            };

        if !confirmations.is_empty() && !session.confirm_overwrite(&confirmations)? {
            self.reporter.warn("Overwrite declined. Aborting.");
            return Ok(RunOutcome::Aborted(AbortReason::Declined));
        }

        let executed = execute::execute(&moves, self.trash, self.reporter);
        if self.options.cleanup {
            self.prune(&moves);
        }
        let summary = executed?;

        if self.options.verbose {
            for op in moves.iter().filter(|op| op.kind != MoveKind::Unchanged) {
                self.reporter.info(&format!(
                    "{} -> {}",
                    display_relative(&op.source, &self.root),
                    display_relative(&op.destination, &self.root)
                ));
            }
        }
        self.reporter.info(&format!(
            "imv summary: moved={}, unchanged={}",
            summary.moved, summary.unchanged
        ));
        Ok(RunOutcome::Completed(summary))
    }

    fn prune(&self, moves: &[MoveOperation]) {
        let affected: Vec<PathBuf> = moves
            .iter()
            .filter(|op| op.kind != MoveKind::Unchanged)
            .flat_map(|op| [op.source.clone(), op.destination.clone()])
            .collect();
        if affected.is_empty() {
            return;
        }
        let removed = cleanup::prune_empty_dirs(&affected, &self.root);
        for dir in &removed {
            log::debug!("removed empty directory {}", dir.display());
        }
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
