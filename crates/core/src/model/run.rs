//! A single run: one task executed with one configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{expand, Benchmark, Column, RunSet};
use crate::paths;
use crate::results::{self, Category, ExpectedResult, Property, RunStatus};
use crate::taskdef::TaskDefDoc;
use crate::tool;

/// One resolved run with everything needed to execute and judge it.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
  /// The task file (or chosen name for runs without a file); names the
  /// log file and appears in reports
  pub identifier: PathBuf,
  /// All files handed to the tool, directories already expanded
  pub input_files: Vec<PathBuf>,
  /// Fully substituted command-line options
  pub options: Vec<String>,
  pub log_file: PathBuf,
  pub result_files_folder: PathBuf,
  /// Expected verdict per property file
  pub expected_results: BTreeMap<PathBuf, ExpectedResult>,
  pub required_files: Vec<PathBuf>,
  pub propertyfile: Option<PathBuf>,
  pub properties: Vec<Property>,
  /// Per-run copies of the benchmark columns, values filled after execution
  pub columns: Vec<Column>,
  /// Measurement values, `@`-prefixed keys are hidden
  pub values: BTreeMap<String, serde_json::Value>,
  pub status: RunStatus,
  pub category: Category,
}

impl Run {
  fn new(
    identifier: PathBuf,
    input_files: Vec<PathBuf>,
    file_options: &[String],
    run_set: &RunSet,
    benchmark: &Benchmark,
    declared_propertyfile: Option<&str>,
    required_files_patterns: &BTreeSet<String>,
    extra_required_files: Vec<PathBuf>,
  ) -> Run {
    let basename = paths::basename(&identifier);
    let log_file = run_set
      .log_folder
      .join(format!("{}{basename}.log", run_set.log_prefix));
    let result_files_folder = run_set.result_files_folder.join(&basename);

    let mut required: BTreeSet<PathBuf> = extra_required_files.into_iter().collect();
    let rel_sourcefile = paths::relativize(&identifier, &benchmark.base_dir);
    for pattern in required_files_patterns {
      let found =
        run_set.expand_pattern(benchmark, pattern, &benchmark.base_dir, Some(&rel_sourcefile));
      if found.is_empty() {
        warn!(
          "Pattern {pattern:?} in requiredfiles entry did not match any file for task {}.",
          identifier.display()
        );
      }
      required.extend(found);
    }

    let ctx = run_set.var_context(benchmark).with_task_file(&identifier);
    let mut options = run_set.options.clone();
    options.extend(file_options.iter().cloned());
    let options = ctx.apply(&options);

    // The declared value (not the resolved path) keys the deduplicated
    // warnings, mirroring how repeated runs share one declaration.
    let declared = declared_propertyfile
      .map(str::to_string)
      .or_else(|| run_set.propertyfile.clone());
    let mut propertyfile = None;
    match &declared {
      None => benchmark.warnings.warn(
        None,
        "No propertyfile specified. Score computation will ignore the results.",
      ),
      Some(pattern) => {
        let expanded = expand::glob_expand(pattern, &benchmark.base_dir);
        let substituted = PathBuf::from(ctx.apply_one(pattern));
        if let Some(first) = expanded.first() {
          if expanded.len() > 1 {
            benchmark.warnings.warn(
              Some(pattern),
              &format!(
                "Pattern {pattern:?} for input file {} in propertyfile entry \
                 matches more than one file. Only {} will be used.",
                identifier.display(),
                first.display()
              ),
            );
          }
          propertyfile = Some(first.clone());
        } else if substituted.is_file() {
          propertyfile = Some(substituted);
        } else {
          benchmark.warnings.warn(
            Some(pattern),
            &format!(
              "Pattern {pattern:?} for input file {} in propertyfile entry \
               did not match any file. It will be ignored.",
              identifier.display()
            ),
          );
        }
      }
    }
    if let Some(file) = &propertyfile {
      required.insert(file.clone());
    }

    // Column patterns only depend on the task, so they are substituted
    // here once and the classifier stays context free.
    let column_file = input_files.first().map(PathBuf::as_path).unwrap_or(&identifier);
    let column_ctx = run_set.var_context(benchmark).with_task_file(column_file);
    let columns = benchmark
      .columns
      .iter()
      .map(|column| Column {
        text: column_ctx.apply_one(&column.text),
        title: column.title.clone(),
        number_of_digits: column.number_of_digits,
        value: None,
      })
      .collect();

    Run {
      identifier,
      input_files,
      options,
      log_file,
      result_files_folder,
      expected_results: BTreeMap::new(),
      required_files: required.into_iter().collect(),
      propertyfile,
      properties: Vec::new(),
      columns,
      values: BTreeMap::new(),
      status: RunStatus::Unobserved,
      category: Category::Unknown,
    }
  }

  /// Creates a run directly from an input file.
  ///
  /// Append patterns contribute extra input files, directories expand
  /// to their contents, and an expected verdict may be encoded in the
  /// file name.
  pub(crate) fn from_input_file(
    input_file: &Path,
    file_options: &[String],
    run_set: &RunSet,
    benchmark: &Benchmark,
    declared_propertyfile: Option<&str>,
    required_files_patterns: &BTreeSet<String>,
    append_patterns: &[String],
  ) -> Run {
    let mut input_files = vec![input_file.to_path_buf()];
    let file_dir = input_file.parent().unwrap_or(Path::new("."));
    for pattern in append_patterns {
      input_files.extend(run_set.expand_pattern(benchmark, pattern, file_dir, Some(input_file)));
    }
    let input_files = expand::expand_dirs(input_files);

    let mut run = Run::new(
      input_file.to_path_buf(),
      input_files,
      file_options,
      run_set,
      benchmark,
      declared_propertyfile,
      required_files_patterns,
      Vec::new(),
    );

    if let Some(prop_file) = run.propertyfile.clone() {
      let prop = Property::from_file(&prop_file);
      let encoded = results::expected_results_of_file(input_file);
      if let Some(expected) = encoded.get(&prop.name) {
        run.expected_results.insert(prop_file, expected.clone());
      }
      run.properties = vec![prop];
    }
    run
  }

  /// Creates a run from a YAML task definition.
  ///
  /// Returns `None` when the definition does not declare the property
  /// the run set checks, which silently skips the task.
  pub(crate) fn from_task_definition(
    task_def_file: &Path,
    file_options: &[String],
    run_set: &RunSet,
    benchmark: &Benchmark,
    declared_propertyfile: Option<&str>,
    required_files_patterns: &BTreeSet<String>,
  ) -> Result<Option<Run>> {
    let doc = TaskDefDoc::load(task_def_file)?;
    let file = task_def_file.display().to_string();
    let def_dir = task_def_file.parent().unwrap_or(Path::new("."));

    let expand_patterns = |patterns: Vec<String>| -> Result<Vec<PathBuf>> {
      let mut found = Vec::new();
      for pattern in patterns {
        let expanded = expand::glob_expand(&pattern, def_dir);
        if expanded.is_empty() {
          return Err(Error::TaskDefinition {
            file: file.clone(),
            reason: format!("pattern {pattern:?} did not match any paths"),
          });
        }
        found.extend(expanded);
      }
      Ok(found)
    };

    let input_files = expand_patterns(doc.input_file_patterns())?;
    if input_files.is_empty() {
      return Err(Error::TaskDefinition {
        file: file.clone(),
        reason: "does not define any input files".to_string(),
      });
    }
    let required_files = expand_patterns(doc.required_file_patterns())?;

    let mut run = Run::new(
      task_def_file.to_path_buf(),
      input_files,
      file_options,
      run_set,
      benchmark,
      declared_propertyfile,
      required_files_patterns,
      required_files,
    );

    let Some(prop_file) = run.propertyfile.clone() else {
      return Ok(Some(run));
    };
    let prop = Property::from_file(&prop_file);
    run.properties = vec![prop];

    let mut matches = 0;
    for decl in &doc.properties {
      let expanded = expand::glob_expand(&decl.property_file, def_dir);
      if expanded.len() != 1 {
        return Err(Error::TaskDefinition {
          file: file.clone(),
          reason: format!(
            "property pattern {:?} does not refer to exactly one file",
            decl.property_file
          ),
        });
      }
      if !same_file(&prop_file, &expanded[0]) {
        continue;
      }
      matches += 1;
      if matches > 1 {
        return Err(Error::TaskDefinition {
          file: file.clone(),
          reason: format!("property {prop_file:?} specified multiple times"),
        });
      }
      let verdict = decl.expected_verdict_bool().map_err(|bad| Error::TaskDefinition {
        file: file.clone(),
        reason: format!(
          "invalid expected result {bad:?} for property {:?}",
          decl.property_file
        ),
      })?;
      run
        .expected_results
        .insert(prop_file.clone(), ExpectedResult::new(verdict, decl.subproperty.clone()));
    }

    if run.expected_results.is_empty() {
      debug!(
        "Ignoring run {:?} because it does not have the property from {}.",
        run.identifier,
        prop_file.display()
      );
      return Ok(None);
    }
    Ok(Some(run))
  }

  /// Creates a run that has no input file, identified by a chosen name.
  pub(crate) fn without_file(
    identifier: &str,
    file_options: &[String],
    run_set: &RunSet,
    benchmark: &Benchmark,
    declared_propertyfile: Option<&str>,
    required_files_patterns: &BTreeSet<String>,
  ) -> Run {
    Run::new(
      PathBuf::from(identifier),
      Vec::new(),
      file_options,
      run_set,
      benchmark,
      declared_propertyfile,
      required_files_patterns,
      Vec::new(),
    )
  }

  /// The command line for this run.
  ///
  /// Requires the executable to be assigned first. Runs without input
  /// files pass their identifier instead.
  pub fn cmdline(&self, benchmark: &Benchmark) -> Result<Vec<String>> {
    let executable = benchmark
      .executable
      .as_deref()
      .ok_or(Error::ExecutableNotSet)?;
    let files: &[PathBuf] = if self.input_files.is_empty() {
      std::slice::from_ref(&self.identifier)
    } else {
      &self.input_files
    };
    tool::cmdline_for_run(
      &benchmark.tool,
      executable,
      &self.options,
      files,
      self.propertyfile.as_deref(),
      &benchmark.limits,
    )
  }
}

/// Path equality up to symlinks and relative prefixes.
fn same_file(a: &Path, b: &Path) -> bool {
  if a == b {
    return true;
  }
  match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
    (Ok(a), Ok(b)) => a == b,
    _ => false,
  }
}
