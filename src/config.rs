use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::report::ColorChoice;

/// Looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAMES: [&str; 3] = [".imv.yaml", ".imv.yml", ".imv.json"];

/// One layer of settings. The command line produces one, the config file
/// another; `layered_over` merges them.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub editor: Option<String>,
    pub overwrite: Option<bool>,
    pub trash: Option<bool>,
    pub cleanup: Option<bool>,
    pub gitignore: Option<bool>,
    pub include_hidden: Option<bool>,
    pub ignore: Option<Vec<String>>,
    pub color: Option<ColorChoice>,
}

impl FileConfig {
    /// Values set in `self` win; unset ones fall back to `base`.
    pub fn layered_over(self, base: FileConfig) -> FileConfig {
        FileConfig {
            editor: self.editor.or(base.editor),
            overwrite: self.overwrite.or(base.overwrite),
            trash: self.trash.or(base.trash),
            cleanup: self.cleanup.or(base.cleanup),
            gitignore: self.gitignore.or(base.gitignore),
            include_hidden: self.include_hidden.or(base.include_hidden),
            ignore: self.ignore.or(base.ignore),
            color: self.color.or(base.color),
        }
    }
}

/// Settings for one run, validated once at the boundary.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub editor: Option<String>,
    pub overwrite: bool,
    pub trash: bool,
    pub cleanup: bool,
    pub gitignore: bool,
    pub include_hidden: bool,
    pub ignore: Vec<String>,
    pub color: ColorChoice,
    pub verbose: bool,
}

impl Options {
    pub fn from_config(config: FileConfig, verbose: bool) -> Result<Self> {
        let options = Options {
            editor: config.editor,
            overwrite: config.overwrite.unwrap_or(false),
            trash: config.trash.unwrap_or(false),
            cleanup: config.cleanup.unwrap_or(false),
            gitignore: config.gitignore.unwrap_or(false),
            include_hidden: config.include_hidden.unwrap_or(false),
            ignore: config.ignore.unwrap_or_default(),
            color: config.color.unwrap_or_default(),
            verbose,
        };
        options.check()?;
        Ok(options)
    }

    pub fn check(&self) -> Result<()> {
        if self.overwrite && self.trash {
            bail!("Please use either `overwrite` or `trash` options, but not both at the same time.");
        }
        Ok(())
    }

    pub fn filters_requested(&self) -> bool {
        self.gitignore || !self.ignore.is_empty()
    }
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let config: FileConfig = if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?
    } else {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?
    };
    Ok(config)
}

/// Explicit path first, then the first default file name present in `root`.
pub fn find_config(explicit: Option<&Path>, root: &Path) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_config(path).map(Some);
    }

    let found: Option<PathBuf> = CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.is_file());
    match found {
        Some(path) => {
            log::debug!("using config {}", path.display());
            load_config(&path).map(Some)
        }
        None => Ok(None),
    }
}
