use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use is_terminal::IsTerminal;
use serde::Deserialize;
use simplelog::{ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

/// Sink for everything the user is meant to read. Shared with the move
/// workers, hence `Sync`.
pub trait Reporter: Sync {
    fn info(&self, text: &str);
    fn warn(&self, text: &str);
    fn error(&self, text: &str);
    fn progress(&self, current: usize, total: usize);
}

pub struct ConsoleReporter {
    colorize: bool,
    show_progress: bool,
}

impl ConsoleReporter {
    pub fn new(color: ColorChoice) -> Self {
        Self {
            colorize: color.should_color(),
            show_progress: io::stdout().is_terminal(),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colorize {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, text: &str) {
        println!("{text}");
    }

    fn warn(&self, text: &str) {
        println!("{}", self.paint(YELLOW, text));
    }

    fn error(&self, text: &str) {
        eprintln!("{}", self.paint(RED, text));
    }

    fn progress(&self, current: usize, total: usize) {
        if !self.show_progress {
            return;
        }
        let mut out = io::stdout().lock();
        let _ = write!(out, "\rmoving files {current}/{total}");
        if current >= total {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

/// Diagnostics for `log` macros go to stderr; user-facing text does not.
pub fn init_logger(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    TermLogger::init(
        level,
        config,
        TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

#[cfg(test)]
pub use recording::{Level, RecordingReporter};
