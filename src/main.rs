use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};

mod cleanup;
mod config;
mod editor;
mod execute;
mod files;
mod imv;
mod paths;
mod plan;
mod report;

use config::{FileConfig, Options, find_config};
use execute::SystemTrash;
use imv::{Imv, TerminalSession};
use report::{ColorChoice, ConsoleReporter, Reporter, init_logger};

#[derive(Debug, Parser)]
#[command(
    name = "imv",
    version,
    about = "Rename and move files by editing their paths in your editor"
)]
struct Cli {
    /// A quoted glob pattern, or the paths your shell already expanded.
    #[arg(value_name = "FILES", required = true)]
    inputs: Vec<String>,
    /// Editor command, e.g. "code --wait". Defaults to git's core.editor.
    #[arg(short, long, value_name = "COMMAND")]
    editor: Option<String>,
    /// Skip files ignored by the .gitignore of the working directory.
    #[arg(short, long, action = ArgAction::SetTrue)]
    gitignore: bool,
    /// Skip files matching this glob. Repeatable.
    #[arg(short, long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,
    /// Replace existing files after confirmation.
    #[arg(short, long, action = ArgAction::SetTrue)]
    overwrite: bool,
    /// Send existing files to the trash instead of refusing to move.
    #[arg(short, long, action = ArgAction::SetTrue)]
    trash: bool,
    /// Remove directories left empty after moving.
    #[arg(short, long, action = ArgAction::SetTrue)]
    cleanup: bool,
    #[arg(long = "include-hidden", action = ArgAction::SetTrue)]
    include_hidden: bool,
    /// Settings file (.yaml, .yml or .json). Defaults to .imv.yaml in the working directory.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    #[arg(long = "color", value_enum)]
    color: Option<ColorChoice>,
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Cli {
    /// Flags that were not given stay unset so the config file can fill them.
    fn as_layer(&self) -> FileConfig {
        FileConfig {
            editor: self.editor.clone(),
            overwrite: self.overwrite.then_some(true),
            trash: self.trash.then_some(true),
            cleanup: self.cleanup.then_some(true),
            gitignore: self.gitignore.then_some(true),
            include_hidden: self.include_hidden.then_some(true),
            ignore: (!self.ignore.is_empty()).then(|| self.ignore.clone()),
            color: self.color,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logger(cli.verbose) {
        eprintln!("{err:#}");
    }

    let (root, options) = match settings(&cli) {
        Ok(settings) => settings,
        Err(err) => return fail(&ConsoleReporter::new(cli.color.unwrap_or_default()), &err),
    };
    let reporter = ConsoleReporter::new(options.color);
    let mut session = TerminalSession::new(options.editor.clone());

    match Imv::new(root, options, &reporter, &SystemTrash).run(&cli.inputs, &mut session) {
        Ok(outcome) if outcome.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => fail(&reporter, &err),
    }
}

/// Working directory plus the command line layered over the config file.
fn settings(cli: &Cli) -> Result<(PathBuf, Options)> {
    let root = env::current_dir().context("reading the working directory")?;
    let file_layer = find_config(cli.config.as_deref(), &root)?.unwrap_or_default();
    let options = Options::from_config(cli.as_layer().layered_over(file_layer), cli.verbose)?;
    log::debug!("options: {options:?}");
    Ok((root, options))
}

fn fail(reporter: &dyn Reporter, err: &anyhow::Error) -> ExitCode {
    reporter.error(&format!("{err:#}"));
    ExitCode::FAILURE
}
