//! Pattern expansion for task files and file sets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::document::TasksDoc;
use crate::error::{Error, Result};
use crate::paths;

/// Expands a glob pattern relative to `base_dir` into a sorted list of
/// existing paths. Absolute patterns ignore `base_dir`.
///
/// The joined pattern is lexically normalized first, so the same file
/// reached through different `..` routes expands to the same path.
/// An invalid pattern is reported and expands to nothing.
pub fn glob_expand(pattern: &str, base_dir: &Path) -> Vec<PathBuf> {
  let full = if Path::new(pattern).is_absolute() {
    PathBuf::from(pattern)
  } else {
    base_dir.join(pattern)
  };
  let full = paths::normalize(&full);
  match glob::glob(&full.to_string_lossy()) {
    Ok(paths) => {
      let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
      found.sort();
      found
    }
    Err(e) => {
      warn!("Invalid file pattern {pattern:?}: {e}");
      Vec::new()
    }
  }
}

/// Shell-style wildcard matching for selections.
///
/// Missing and empty names never match, so unnamed entries cannot be
/// selected by pattern.
pub fn wildcard_match(word: Option<&str>, pattern: &str) -> bool {
  match word {
    Some(word) if !word.is_empty() => glob::Pattern::new(pattern)
      .map(|p| p.matches(word))
      .unwrap_or(false),
    _ => false,
  }
}

/// Replaces directories with their contained files, recursively.
///
/// Hidden files and directories are skipped, the traversal is sorted by
/// file name. Plain files pass through unchanged.
pub fn expand_dirs(paths: Vec<PathBuf>) -> Vec<PathBuf> {
  fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
      && entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
  }

  let mut result = Vec::new();
  for path in paths {
    if path.is_dir() {
      let entries = WalkDir::new(&path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path());
      result.extend(entries);
    } else {
      result.push(path);
    }
  }
  result
}

/// Whether a line carries no pattern: empty or a `#` or `//` comment.
pub fn is_comment(line: &str) -> bool {
  line.is_empty() || line.starts_with('#') || line.starts_with("//")
}

/// Heuristic for set files that are actually source code, which happens
/// when `include` and `includesfile` are confused.
fn looks_like_code(text: &str) -> bool {
  text
    .lines()
    .any(|line| !is_comment(line) && line.contains('{'))
}

/// Collects the task files of one block.
///
/// `expand` turns one pattern and base directory into matching paths;
/// the caller supplies it so substitution and warning behavior stay in
/// one place. Set files are read line by line, each line expanded
/// relative to the set file's directory. Excludes remove files by exact
/// path, and duplicates keep their first occurrence.
pub fn collect_task_files(
  block: &TasksDoc,
  base_dir: &Path,
  expand: &dyn Fn(&str, &Path) -> Vec<PathBuf>,
) -> Result<Vec<PathBuf>> {
  let mut files: Vec<PathBuf> = Vec::new();

  for pattern in &block.include {
    files.extend(expand(pattern, base_dir));
  }

  for pattern in &block.includesfile {
    for list_file in expand(pattern, base_dir) {
      let text = std::fs::read_to_string(&list_file)?;
      if looks_like_code(&text) {
        return Err(Error::Definition(format!(
          "'{}' seems to contain code instead of a set of source file names. \
           Please check your benchmark definition file \
           or remove bracket '{{' from this file.",
          list_file.display()
        )));
      }
      let list_dir = list_file.parent().unwrap_or(Path::new("."));
      for line in text.lines() {
        let line = line.trim();
        if !is_comment(line) {
          files.extend(expand(line, list_dir));
        }
      }
    }
  }

  for pattern in &block.exclude {
    for excluded in expand(pattern, base_dir) {
      files.retain(|f| *f != excluded);
    }
  }

  for pattern in &block.excludesfile {
    for list_file in expand(pattern, base_dir) {
      let text = std::fs::read_to_string(&list_file)?;
      let list_dir = list_file.parent().unwrap_or(Path::new("."));
      for line in text.lines() {
        let line = line.trim();
        if !is_comment(line) {
          for excluded in expand(line, list_dir) {
            files.retain(|f| *f != excluded);
          }
        }
      }
    }
  }

  let mut seen = HashSet::new();
  files.retain(|f| seen.insert(f.clone()));
  Ok(files)
}

// =============================================================================
// Tests
// =============================================================================
