//! Schema of the benchmark definition document.
//!
//! A definition is a TOML file naming the tool to benchmark, resource
//! limits, global options and one `rundefinition` entry per variant to
//! execute. Task blocks list the input files, either directly or through
//! set files with one pattern per line.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// One output column extracted from the tool output of each run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnDoc {
  /// Search pattern handed to the tool adapter
  pub text: String,
  /// Column title, defaults to the pattern itself
  pub title: Option<String>,
  /// Number of significant digits for rounding
  pub number_of_digits: Option<u32>,
}

/// One hardware requirement declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequireDoc {
  pub cpu_model: Option<String>,
  /// Required core count as text, validated during resolution
  pub cpu_cores: Option<String>,
  /// Required memory, bare numbers are legacy MB
  pub memory: Option<String>,
}

/// One block of tasks inside a run definition (or shared globally).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TasksDoc {
  /// Optional block name used for selection and output grouping
  pub name: Option<String>,
  /// Patterns for input files and task-definition files
  pub include: Vec<String>,
  /// Patterns for set files listing one pattern per line
  pub includesfile: Vec<String>,
  /// Patterns removing previously included files
  pub exclude: Vec<String>,
  /// Set files whose entries are removed again
  pub excludesfile: Vec<String>,
  /// Patterns for extra input files appended to every run
  pub append: Vec<String>,
  /// Identifiers for runs that have no input file at all
  pub withoutfile: Vec<String>,
  /// Extra command-line options for runs of this block
  pub options: Vec<String>,
  pub propertyfile: Option<String>,
  pub requiredfiles: Vec<String>,
}

/// One run definition, i.e. one configuration of the tool to execute
/// over all task blocks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunDefinitionDoc {
  /// Optional name, empty names keep the benchmark name unchanged
  pub name: Option<String>,
  pub options: Vec<String>,
  pub propertyfile: Option<String>,
  pub requiredfiles: Vec<String>,
  pub tasks: Vec<TasksDoc>,
  /// Trap for the pre-`tasks` format, rejected during validation
  pub sourcefiles: Option<toml::Value>,
}

/// The root of a benchmark definition document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BenchmarkDoc {
  /// Name of the tool adapter to benchmark
  pub tool: Option<String>,
  /// Human-readable tool name override for reports
  pub display_name: Option<String>,

  pub timelimit: Option<String>,
  pub hardtimelimit: Option<String>,
  pub walltimelimit: Option<String>,
  pub memlimit: Option<String>,
  /// Core limit as text so `-1` overrides work like the other limits
  pub cpu_cores: Option<String>,

  /// Number of parallel executions, defaults to 1
  pub threads: Option<u32>,

  pub options: Vec<String>,
  pub propertyfile: Option<String>,
  pub columns: Vec<ColumnDoc>,
  pub requiredfiles: Vec<String>,
  /// Patterns for result files to keep, relative to the working directory
  pub resultfiles: Vec<String>,
  pub require: Vec<RequireDoc>,

  /// Task blocks shared by all run definitions
  pub tasks: Vec<TasksDoc>,
  pub rundefinition: Vec<RunDefinitionDoc>,

  /// Trap for the pre-`tasks` format, rejected during validation
  pub sourcefiles: Option<toml::Value>,
}

impl BenchmarkDoc {
  /// Parses a definition from text. `origin` names the source in errors.
  pub fn parse(text: &str, origin: &str) -> Result<Self> {
    let doc: BenchmarkDoc = toml::from_str(text)
      .map_err(|e| Error::Definition(format!("Cannot parse benchmark file {origin}: {e}")))?;
    doc.validate(origin)?;
    Ok(doc)
  }

  /// Reads and parses a definition file.
  pub fn load(path: &Path) -> Result<Self> {
    debug!("Loading benchmark definition {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::parse(&text, &path.display().to_string())
  }

  fn validate(&self, origin: &str) -> Result<()> {
    if self.tool.as_deref().is_none_or(str::is_empty) {
      return Err(Error::Definition(format!(
        "Benchmark file {origin} does not define a tool."
      )));
    }
    if self.sourcefiles.is_some()
      || self.rundefinition.iter().any(|d| d.sourcefiles.is_some())
    {
      return Err(Error::Definition(format!(
        "Benchmark file {origin} has unsupported old format. \
         Rename 'sourcefiles' entries to 'tasks'."
      )));
    }
    Ok(())
  }
}

// =============================================================================
// Tests
// =============================================================================
