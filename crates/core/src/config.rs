//! Command-line overrides applied while resolving a benchmark definition.
//!
//! Everything here is optional. An empty `Config` resolves a definition
//! exactly as written; populated fields override or narrow it.

use serde::{Deserialize, Serialize};

fn default_output_path() -> String {
  "./results/".to_string()
}

/// Overrides and selections from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Extra name suffix appended to the benchmark name
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  /// Prefix for all output paths (default: "./results/")
  ///
  /// This is a plain string prefix, not a directory join: a value
  /// without a trailing separator glues onto the benchmark name.
  pub output_path: String,

  /// Override for the CPU time limit; "-1" removes the limit
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timelimit: Option<String>,

  /// Override for the wall time limit; "-1" removes the limit
  #[serde(skip_serializing_if = "Option::is_none")]
  pub walltimelimit: Option<String>,

  /// Override for the memory limit; "-1" removes the limit
  #[serde(skip_serializing_if = "Option::is_none")]
  pub memorylimit: Option<String>,

  /// Override for the CPU core limit; "-1" removes the limit
  #[serde(skip_serializing_if = "Option::is_none")]
  pub corelimit: Option<String>,

  /// Override for the number of parallel executions
  #[serde(skip_serializing_if = "Option::is_none")]
  pub num_of_threads: Option<u32>,

  /// Shell-style patterns selecting run definitions by name.
  /// Empty means all run definitions are selected.
  pub selected_run_definitions: Vec<String>,

  /// Shell-style patterns selecting task blocks by declared name or
  /// index. Empty means all blocks.
  pub selected_sourcefile_sets: Vec<String>,

  /// Override for the required CPU model
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cpu_model: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      name: None,
      output_path: default_output_path(),
      timelimit: None,
      walltimelimit: None,
      memorylimit: None,
      corelimit: None,
      num_of_threads: None,
      selected_run_definitions: Vec::new(),
      selected_sourcefile_sets: Vec::new(),
      cpu_model: None,
    }
  }
}
