use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

const LIST_FILE_NAME: &str = "FILES";

const LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    Saved,
    /// The editor died from a signal such as Ctrl-C.
    Interrupted,
}

/// Explicit choice first, then `git config core.editor` (git already lets
/// the repository config override the global one), then `$VISUAL` and
/// `$EDITOR`.
pub fn resolve_editor(explicit: Option<&str>) -> Result<String> {
    if let Some(editor) = explicit {
        return pick_editor([Some(editor.to_string())]);
    }
    pick_editor([
        git_core_editor(),
        env::var("VISUAL").ok(),
        env::var("EDITOR").ok(),
    ])
}

fn pick_editor<I>(candidates: I) -> Result<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|editor| editor.trim().to_string())
        .find(|editor| !editor.is_empty())
        .context(
            "Your git `core.editor` variable is not set or you are missing the `--editor` argument.",
        )
}

fn git_core_editor() -> Option<String> {
    let output = Command::new("git")
        .args(["config", "--get", "core.editor"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        log::debug!("editor from git config: {value}");
        Some(value)
    }
}

/// The list the user edits, inside a private temp directory that is removed
/// when this value is dropped.
pub struct ListFile {
    _dir: TempDir,
    path: PathBuf,
}

impl ListFile {
    pub fn create(lines: &[String]) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("imv-")
            .tempdir()
            .context("creating temp directory for the file list")?;
        let path = dir.path().join(LIST_FILE_NAME);
        let mut body = lines.join(LINE_ENDING);
        body.push_str(LINE_ENDING);
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_lines(&self) -> Result<Vec<String>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading edited list {}", self.path.display()))?;
        Ok(parse_list(&text))
    }
}

/// Trailing line breaks are dropped, so an emptied file still yields one
/// (blank) line.
fn parse_list(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.trim_end_matches(['\r', '\n'])
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Runs `<editor> <file>` through the shell and blocks until it exits.
pub fn launch_editor(editor: &str, file: &Path) -> Result<EditStatus> {
    let command_line = format!("{editor} {}", shell_quote(file));
    log::debug!("running editor: {command_line}");
    let status = shell_command(&command_line)
        .status()
        .with_context(|| format!("launching editor `{editor}`"))?;

    if was_interrupted(&status) {
        return Ok(EditStatus::Interrupted);
    }
    if !status.success() {
        bail!("editor `{editor}` exited with {status}");
    }
    Ok(EditStatus::Saved)
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

#[cfg(unix)]
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

#[cfg(windows)]
fn shell_quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

#[cfg(unix)]
fn was_interrupted(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some() || status.code() == Some(130)
}

#[cfg(windows)]
fn was_interrupted(status: &ExitStatus) -> bool {
    // STATUS_CONTROL_C_EXIT
    status.code() == Some(0xC000_013A_u32 as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_parsing_drops_trailing_breaks() {
        assert_eq!(parse_list("a.txt\nb.txt\n\n"), vec!["a.txt", "b.txt"]);
        assert_eq!(parse_list("a.txt\r\nb.txt\r\n"), vec!["a.txt", "b.txt"]);
        assert_eq!(parse_list("\u{feff}a.txt"), vec!["a.txt"]);
    }

    #[test]
    fn emptied_list_is_one_blank_line() {
        assert_eq!(parse_list(""), vec![""]);
        assert_eq!(parse_list("\n\n"), vec![""]);
    }

    #[test]
    fn blank_lines_in_the_middle_survive() {
        assert_eq!(parse_list("a.txt\n\nc.txt\n"), vec!["a.txt", "", "c.txt"]);
    }

    #[test]
    fn list_file_round_trips_lines() {
        let lines = vec!["foo/fidget.txt".to_string(), "flag.doc".to_string()];
        let list = ListFile::create(&lines).expect("list file");
        assert!(list.path().ends_with(LIST_FILE_NAME));
        assert_eq!(list.read_lines().expect("read back"), lines);
    }

    #[test]
    fn list_directory_is_removed_on_drop() {
        let list = ListFile::create(&["a".to_string()]).expect("list file");
        let dir = list.path().parent().expect("parent").to_path_buf();
        drop(list);
        assert!(!dir.exists());
    }

    #[test]
    fn first_non_blank_editor_wins() {
        let editor = pick_editor([None, Some("   ".to_string()), Some("vim -f".to_string())])
            .expect("editor found");
        assert_eq!(editor, "vim -f");
    }

    #[test]
    fn blank_editor_is_a_configuration_error() {
        let err = resolve_editor(Some("  ")).expect_err("blank editor rejected");
        assert!(err.to_string().contains("core.editor"));
        assert!(pick_editor([None, None]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn editor_command_edits_the_file() {
        let list = ListFile::create(&["a.txt".to_string()]).expect("list file");
        let status = launch_editor("printf 'b.txt\\n' >", list.path()).expect("editor runs");
        assert_eq!(status, EditStatus::Saved);
        assert_eq!(list.read_lines().expect("read back"), vec!["b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn killed_editor_counts_as_interrupted() {
        let list = ListFile::create(&["a.txt".to_string()]).expect("list file");
        let status = launch_editor("kill -TERM $$;", list.path()).expect("editor runs");
        assert_eq!(status, EditStatus::Interrupted);
    }

    #[cfg(unix)]
    #[test]
    fn failing_editor_is_an_error() {
        let list = ListFile::create(&["a.txt".to_string()]).expect("list file");
        assert!(launch_editor("exit 3;", list.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn quoting_survives_spaces_and_quotes() {
        assert_eq!(shell_quote(Path::new("/tmp/it's here")), r"'/tmp/it'\''s here'");
    }
}
