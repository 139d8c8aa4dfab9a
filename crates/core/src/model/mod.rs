//! The resolved benchmark model.
//!
//! [`Benchmark::resolve`] turns a benchmark definition document plus the
//! session [`Config`] into the full object graph: a [`Benchmark`] owning
//! [`RunSet`]s, which own [`SourcefileSet`] blocks, which own [`Run`]s.
//! Resolution is synchronous and touches the filesystem only to expand
//! file patterns and read task-definition files.

pub mod expand;
mod run;
mod runset;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::document::BenchmarkDoc;
use crate::error::{Error, Result};
use crate::limits::{self, ResourceLimits};
use crate::paths;
use crate::requirements::{self, Requirements};
use crate::tool::{ToolHandle, ToolRegistry};

pub use run::Run;
pub use runset::{RunSet, SourcefileSet};

// =============================================================================
// Deduplicated warnings
// =============================================================================

/// Deduplicates warnings that would otherwise repeat for every run.
///
/// Keys are the declared values that triggered the warning, so one bad
/// property-file declaration warns once no matter how many runs share it.
#[derive(Debug, Default)]
pub struct WarnOnce {
  seen: Mutex<HashSet<Option<String>>>,
}

impl WarnOnce {
  pub fn new() -> WarnOnce {
    WarnOnce::default()
  }

  /// Logs the message unless this key was already warned about.
  pub fn warn(&self, key: Option<&str>, message: &str) {
    let mut seen = match self.seen.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if seen.insert(key.map(str::to_string)) {
      warn!("{message}");
    }
  }
}

// =============================================================================
// Columns
// =============================================================================

/// One extra value column extracted from tool output.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
  /// Pattern handed to the tool adapter for extraction
  pub text: String,
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub number_of_digits: Option<u32>,
  /// Extracted value, filled in by the classifier
  pub value: Option<String>,
}

// =============================================================================
// Benchmark
// =============================================================================

/// A fully resolved benchmark session.
#[derive(Debug, Clone, Serialize)]
pub struct Benchmark {
  /// Definition file stem plus the configured name suffix
  pub name: String,
  /// Timestamp of the session start, used in output paths
  pub instance: String,
  pub benchmark_file: PathBuf,
  /// Directory of the benchmark file, base for relative patterns
  pub base_dir: PathBuf,
  /// Common prefix of all output paths
  pub output_base_name: String,
  pub log_folder: PathBuf,
  pub result_files_folder: PathBuf,
  /// Tool name as declared in the definition
  pub tool_name: String,
  /// Registry module the tool adapter was resolved from
  pub tool_module: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  #[serde(skip)]
  pub tool: ToolHandle,
  /// Assigned by the executor once the tool is located
  #[serde(skip_serializing_if = "Option::is_none")]
  pub executable: Option<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tool_version: Option<String>,
  pub limits: ResourceLimits,
  pub num_of_threads: u32,
  /// Benchmark-level tool options, inherited by every run set
  pub options: Vec<String>,
  /// Benchmark-level property file declaration
  #[serde(skip_serializing_if = "Option::is_none")]
  pub propertyfile: Option<String>,
  pub columns: Vec<Column>,
  /// Benchmark-level required files, already expanded
  pub required_files: BTreeSet<PathBuf>,
  /// Normalized result-file patterns, `["."]` if none declared
  pub result_files_patterns: Vec<String>,
  pub requirements: Requirements,
  pub run_sets: Vec<RunSet>,
  pub config: Config,
  #[serde(skip)]
  pub(crate) warnings: Arc<WarnOnce>,
}

impl Benchmark {
  /// Resolves a benchmark definition file into the full run graph.
  pub fn resolve(
    benchmark_file: &Path,
    config: Config,
    registry: &ToolRegistry,
    start: DateTime<Local>,
  ) -> Result<Benchmark> {
    let doc = BenchmarkDoc::load(benchmark_file)?;
    Benchmark::from_doc(&doc, benchmark_file, config, registry, start)
  }

  /// Resolves an already parsed definition document.
  pub fn from_doc(
    doc: &BenchmarkDoc,
    benchmark_file: &Path,
    config: Config,
    registry: &ToolRegistry,
    start: DateTime<Local>,
  ) -> Result<Benchmark> {
    let base_dir = benchmark_file
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();

    let mut name = benchmark_file
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_else(|| paths::basename(benchmark_file));
    if let Some(suffix) = config.name.as_deref().filter(|n| !n.is_empty()) {
      name = format!("{name}.{suffix}");
    }

    let instance = start.format("%Y-%m-%d_%H%M").to_string();
    // The output path is a plain string prefix, so it can end with a
    // directory separator or a file-name fragment.
    let output_base_name = format!("{}{name}.{instance}", config.output_path);
    let log_folder = PathBuf::from(format!("{output_base_name}.logfiles"));
    let result_files_folder = PathBuf::from(format!("{output_base_name}.files"));

    let tool_name = doc.tool.clone().unwrap_or_default();
    let (tool_module, tool) = registry.resolve(&tool_name)?;

    let limits = limits::resolve_limits(doc, &config)?;

    let mut num_of_threads = doc.threads.unwrap_or(1);
    if let Some(threads) = config.num_of_threads {
      num_of_threads = threads;
    }
    if num_of_threads < 1 {
      return Err(Error::Definition(
        "At least one thread must be given.".to_string(),
      ));
    }

    let columns = doc
      .columns
      .iter()
      .map(|column| Column {
        text: column.text.clone(),
        title: column.title.clone().unwrap_or_else(|| column.text.clone()),
        number_of_digits: column.number_of_digits,
        value: None,
      })
      .collect();

    let mut required_files = BTreeSet::new();
    for pattern in &doc.requiredfiles {
      let expanded = expand::glob_expand(pattern, &base_dir);
      if expanded.is_empty() {
        warn!("Pattern {pattern:?} in requiredfiles entry did not match any file.");
      }
      required_files.extend(expanded);
    }

    let mut result_files_patterns = Vec::new();
    for pattern in &doc.resultfiles {
      let normalized = paths::normalize(Path::new(pattern));
      if normalized.starts_with("..") {
        return Err(Error::Definition(format!(
          "Invalid relative result-files pattern '{pattern}'."
        )));
      }
      result_files_patterns.push(normalized.display().to_string());
    }
    if result_files_patterns.is_empty() {
      result_files_patterns.push(".".to_string());
    }

    let requirements = requirements::resolve_requirements(&doc.require, &limits, &config)?;

    let mut benchmark = Benchmark {
      name,
      instance,
      benchmark_file: benchmark_file.to_path_buf(),
      base_dir,
      output_base_name,
      log_folder,
      result_files_folder,
      tool_name,
      tool_module,
      display_name: doc.display_name.clone(),
      tool,
      executable: None,
      tool_version: None,
      limits,
      num_of_threads,
      options: doc.options.clone(),
      propertyfile: doc.propertyfile.clone(),
      columns,
      required_files,
      result_files_patterns,
      requirements,
      run_sets: Vec::new(),
      config,
      warnings: Arc::new(WarnOnce::new()),
    };

    let mut run_sets = Vec::new();
    for (index, definition) in doc.rundefinition.iter().enumerate() {
      run_sets.push(RunSet::new(definition, &benchmark, index + 1, &doc.tasks)?);
    }
    benchmark.run_sets = run_sets;

    if benchmark.run_sets.is_empty() {
      warn!(
        "Benchmark file {} specifies no runs to execute \
         (no rundefinition entries found).",
        benchmark_file.display()
      );
    }
    if !benchmark
      .run_sets
      .iter()
      .any(|run_set| run_set.should_be_executed(&benchmark.config))
    {
      warn!("No rundefinition selected, nothing will be executed.");
      if !benchmark.config.selected_run_definitions.is_empty() {
        let available: Vec<_> = benchmark
          .run_sets
          .iter()
          .map(|run_set| run_set.real_name.clone())
          .collect();
        warn!(
          "The selection {:?} does not match any run definitions of {available:?}.",
          benchmark.config.selected_run_definitions
        );
      }
    } else {
      for selected in &benchmark.config.selected_run_definitions {
        if !benchmark
          .run_sets
          .iter()
          .any(|run_set| expand::wildcard_match(run_set.real_name.as_deref(), selected))
        {
          warn!(
            "The selected run definition {selected:?} is not present in the input file, \
             skipping it."
          );
        }
      }
    }

    Ok(benchmark)
  }

  /// Tool name for reports.
  pub fn tool_display_name(&self) -> &str {
    self.display_name.as_deref().unwrap_or(&self.tool_name)
  }

  /// All files needed for execution, including the tool's program files.
  ///
  /// Requires the executable to be assigned first.
  pub fn all_required_files(&self) -> Result<BTreeSet<PathBuf>> {
    let executable = self.executable.as_deref().ok_or(Error::ExecutableNotSet)?;
    let mut files = self.required_files.clone();
    files.extend(self.tool.program_files(executable));
    Ok(files)
  }

  /// The directory the tool is started in.
  pub fn working_directory(&self) -> Result<PathBuf> {
    let executable = self.executable.as_deref().ok_or(Error::ExecutableNotSet)?;
    Ok(self.tool.working_directory(executable))
  }

  /// Extra environment variables for the tool process.
  pub fn environment(&self) -> Result<BTreeMap<String, String>> {
    let executable = self.executable.as_deref().ok_or(Error::ExecutableNotSet)?;
    Ok(self.tool.environment(executable))
  }

  /// All runs across all run sets, in definition order.
  pub fn runs(&self) -> impl Iterator<Item = &Run> {
    self.run_sets.iter().flat_map(|run_set| run_set.runs())
  }
}

// =============================================================================
// Tests
// =============================================================================
