use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use glob::{MatchOptions, Pattern, glob_with};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::Options;
use crate::paths;

/// Turns the command line inputs into the ordered list of files to edit.
///
/// A single input is a glob pattern expanded here, honoring `ignore`,
/// `gitignore` and hidden-file settings. Several inputs were already
/// expanded by the shell and are taken literally; filters cannot be applied
/// to them after the fact, so asking for filters in that case is an error.
pub fn resolve_inputs(inputs: &[String], options: &Options, root: &Path) -> Result<Vec<String>> {
    match inputs {
        [] => Ok(Vec::new()),
        [pattern] => expand_pattern(pattern, options, root),
        many => {
            if options.filters_requested() {
                bail!(
                    "`ignore` and `gitignore` only work with a single quoted glob pattern, \
                     but the shell already expanded {} paths. Quote your pattern, e.g. imv '**/*.txt'.",
                    many.len()
                );
            }
            let literal = many
                .iter()
                .filter(|input| !input.trim().is_empty())
                .cloned()
                .collect();
            Ok(dedup_preserving_order(literal, root))
        }
    }
}

fn expand_pattern(pattern: &str, options: &Options, root: &Path) -> Result<Vec<String>> {
    if pattern.trim().is_empty() {
        return Ok(Vec::new());
    }

    let exclude = build_exclude_globs(&options.ignore)?;
    let gitignore = if options.gitignore {
        Some(build_gitignore(root)?)
    } else {
        None
    };

    let anchored = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let escaped_root = Pattern::escape(&root.to_string_lossy());
        format!("{escaped_root}/{pattern}")
    };
    let match_options = MatchOptions {
        require_literal_leading_dot: !options.include_hidden,
        ..MatchOptions::new()
    };
    let matches = glob_with(&anchored, match_options)
        .map_err(|err| anyhow!("invalid glob pattern '{pattern}': {err}"))?;

    let mut found = Vec::new();
    for entry in matches {
        let path = entry.map_err(|err| anyhow!("error reading matches for '{pattern}': {err}"))?;
        if !path.is_file() {
            continue;
        }
        let display = display_path(&path, root);
        if should_skip(
            Path::new(&display),
            options.include_hidden,
            exclude.as_ref(),
        ) {
            continue;
        }
        if let Some(matcher) = &gitignore {
            if paths::is_inside_root(&path, root)
                && matcher
                    .matched_path_or_any_parents(&path, false)
                    .is_ignore()
            {
                log::debug!("gitignore skips {display}");
                continue;
            }
        }
        found.push(display);
    }

    Ok(dedup_preserving_order(found, root))
}

/// Matches under `root` are listed relative to it, as the user would type
/// them; everything else keeps its absolute form.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn should_skip(path: &Path, include_hidden: bool, exclude: Option<&GlobSet>) -> bool {
    if !include_hidden && path_components_start_with_dot(path) {
        return true;
    }

    if let Some(set) = exclude {
        let candidate = normalize_slashes(path);
        return set.is_match(candidate.as_str());
    }

    false
}

fn path_components_start_with_dot(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|segment| segment.starts_with('.') && segment != "." && segment != "..")
            .unwrap_or(false)
    })
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `a.txt` and `./a.txt` name one file; the first spelling is kept.
fn dedup_preserving_order(entries: Vec<String>, root: &Path) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let key = paths::comparison_key(&paths::resolve(Path::new(entry), root));
            seen.insert(key)
        })
        .collect()
}

fn build_exclude_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|err| anyhow!("invalid ignore glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build ignore globs: {err}"))
}

fn build_gitignore(root: &Path) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    let sources: [PathBuf; 2] = [root.join(".gitignore"), root.join(".git/info/exclude")];
    for source in sources.iter().filter(|source| source.is_file()) {
        if let Some(err) = builder.add(source) {
            return Err(anyhow!("reading {}: {err}", source.display()));
        }
    }
    builder
        .build()
        .map_err(|err| anyhow!("unable to build gitignore rules: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let temp = tempdir().expect("temp dir");
        let root = temp.path();
        for (path, body) in [
            ("flag.doc", "island"),
            ("bar/opera.doc", "pump"),
            ("foo/myth.doc", "tram"),
            ("foo/fidget.txt", "weapon"),
            ("build/out.doc", "generated"),
            (".hidden/secret.doc", "shh"),
        ] {
            let full = root.join(path);
            fs::create_dir_all(full.parent().expect("parent")).expect("create dir");
            fs::write(full, body).expect("write fixture");
        }
        temp
    }

    fn single(pattern: &str) -> Vec<String> {
        vec![pattern.to_string()]
    }

    fn slashes(list: Vec<String>) -> Vec<String> {
        let mut list: Vec<String> = list.into_iter().map(|item| item.replace('\\', "/")).collect();
        list.sort();
        list
    }

    #[test]
    fn glob_lists_files_relative_to_root() {
        let temp = fixture();
        let found =
            resolve_inputs(&single("**/*.doc"), &Options::default(), temp.path()).expect("glob");
        assert_eq!(
            slashes(found),
            vec!["bar/opera.doc", "build/out.doc", "flag.doc", "foo/myth.doc"]
        );
    }

    #[test]
    fn hidden_files_need_opt_in() {
        let temp = fixture();
        let options = Options {
            include_hidden: true,
            ..Options::default()
        };
        let found = slashes(resolve_inputs(&single("**/*.doc"), &options, temp.path()).expect("glob"));
        assert!(found.contains(&".hidden/secret.doc".to_string()));
    }

    #[test]
    fn directories_are_not_listed() {
        let temp = fixture();
        let found = resolve_inputs(&single("*"), &Options::default(), temp.path()).expect("glob");
        assert_eq!(found, vec!["flag.doc"]);
    }

    #[test]
    fn ignore_globs_filter_matches() {
        let temp = fixture();
        let options = Options {
            ignore: vec!["build/**".to_string(), "**/myth.*".to_string()],
            ..Options::default()
        };
        let found = slashes(resolve_inputs(&single("**/*.doc"), &options, temp.path()).expect("glob"));
        assert_eq!(found, vec!["bar/opera.doc", "flag.doc"]);
    }

    #[test]
    fn gitignore_rules_filter_matches() {
        let temp = fixture();
        fs::write(temp.path().join(".gitignore"), "build/\nflag.doc\n").expect("write gitignore");
        let options = Options {
            gitignore: true,
            ..Options::default()
        };
        let found = slashes(resolve_inputs(&single("**/*.doc"), &options, temp.path()).expect("glob"));
        assert_eq!(found, vec!["bar/opera.doc", "foo/myth.doc"]);
    }

    #[test]
    fn unmatched_or_empty_patterns_yield_nothing() {
        let temp = fixture();
        assert!(
            resolve_inputs(&single("**/*.psd"), &Options::default(), temp.path())
                .expect("glob")
                .is_empty()
        );
        assert!(
            resolve_inputs(&single(""), &Options::default(), temp.path())
                .expect("glob")
                .is_empty()
        );
    }

    #[test]
    fn expanded_paths_are_taken_literally() {
        let temp = fixture();
        let inputs = vec![
            "foo/fidget.txt".to_string(),
            "flag.doc".to_string(),
            "foo/fidget.txt".to_string(),
            "not-there.txt".to_string(),
        ];
        let found = resolve_inputs(&inputs, &Options::default(), temp.path()).expect("literal");
        assert_eq!(found, vec!["foo/fidget.txt", "flag.doc", "not-there.txt"]);
    }

    #[test]
    fn filters_reject_expanded_paths() {
        let temp = fixture();
        let inputs = vec!["flag.doc".to_string(), "bar/opera.doc".to_string()];
        let options = Options {
            gitignore: true,
            ..Options::default()
        };
        let err = resolve_inputs(&inputs, &options, temp.path()).expect_err("filters refused");
        assert!(err.to_string().contains("single quoted glob pattern"));
    }

    #[test]
    fn other_spellings_of_one_file_are_listed_once() {
        let temp = fixture();
        let inputs = vec![
            "foo/fidget.txt".to_string(),
            "./foo/fidget.txt".to_string(),
            "bar/../foo/fidget.txt".to_string(),
            "flag.doc".to_string(),
        ];
        let found = resolve_inputs(&inputs, &Options::default(), temp.path()).expect("literal");
        assert_eq!(found, vec!["foo/fidget.txt", "flag.doc"]);
    }

    #[test]
    fn dot_directories_count_as_hidden_but_parent_steps_do_not() {
        assert!(path_components_start_with_dot(Path::new(".hidden/secret.doc")));
        assert!(path_components_start_with_dot(Path::new("foo/.cache/myth.doc")));
        assert!(!path_components_start_with_dot(Path::new("./bar/opera.doc")));
        assert!(!path_components_start_with_dot(Path::new("../foo/fidget.txt")));
    }

    #[test]
    fn ignore_globs_see_forward_slashes() {
        let globs = build_exclude_globs(&["build/**".to_string()])
            .expect("globs")
            .expect("non-empty set");
        assert!(should_skip(Path::new("build\\out.doc"), false, Some(&globs)));
        assert!(!should_skip(Path::new("bar\\opera.doc"), false, Some(&globs)));
    }
}
