//! Variable substitution for definition values.
//!
//! Values in a benchmark definition may contain placeholders like
//! `${benchmark_path}` or `${inputfile_name}` which are replaced with
//! properties of the resolved benchmark, run set or task file.

use std::path::Path;

use crate::paths;

/// An ordered set of `key -> value` replacements.
///
/// Unrecognized placeholders are left in the text untouched, so
/// substitution is idempotent once every known key has been applied.
#[derive(Debug, Clone, Default)]
pub struct VarContext {
  pairs: Vec<(String, String)>,
}

impl VarContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a replacement pair. Keys must be unique.
  pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    debug_assert!(
      self.pairs.iter().all(|(k, _)| *k != key),
      "duplicate substitution key {key:?}"
    );
    self.pairs.push((key, value.into()));
  }

  /// Returns a copy extended with the task-specific keys for `task_file`.
  ///
  /// Task-definition files get the `taskdef_` prefix, plain input files
  /// the `inputfile_` prefix.
  pub fn with_task_file(&self, task_file: &Path) -> Self {
    let prefix = if task_file.extension().is_some_and(|ext| ext == "yml") {
      "taskdef_"
    } else {
      "inputfile_"
    };
    let dir = task_file
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));

    let mut ctx = self.clone();
    ctx.push(format!("{prefix}name"), paths::basename(task_file));
    ctx.push(format!("{prefix}path"), dir.to_string_lossy());
    ctx.push(
      format!("{prefix}path_abs"),
      paths::absolute(dir).to_string_lossy(),
    );
    ctx
  }

  /// Replaces every `${key}` occurrence in `text`.
  pub fn apply_one(&self, text: &str) -> String {
    let mut out = text.to_string();
    for (key, value) in &self.pairs {
      out = out.replace(&format!("${{{key}}}"), value);
    }
    out
  }

  /// Replaces placeholders in each element of `values`.
  pub fn apply(&self, values: &[String]) -> Vec<String> {
    values.iter().map(|v| self.apply_one(v)).collect()
  }
}

// =============================================================================
// Tests
// =============================================================================
