//! Turns raw run outcomes into final statuses and categories.
//!
//! The executor reports what happened (exit descriptor, measurements,
//! termination reason); [`ResultClassifier::set_result`] decides what it
//! means. A resource-limit condition always wins over the tool's own
//! verdict, but a specific verdict stays visible next to it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::limits::ResourceLimits;
use crate::model::{Benchmark, Run};
use crate::results::{
  Category, CategoryRule, DefaultCategoryRule, LimitCondition, RunStatus, TerminationReason,
  ToolStatus,
};
use crate::tool::ToolHandle;

/// Lines the executor prepends to every log file before the tool output.
const LOG_HEADER_LINES: usize = 6;

/// Exit descriptor of a finished process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitCode {
  /// Exit value, if the process terminated normally
  pub value: Option<i32>,
  /// Terminating signal, if any
  pub signal: Option<i32>,
}

impl ExitCode {
  pub fn returned(value: i32) -> ExitCode {
    ExitCode {
      value: Some(value),
      signal: None,
    }
  }

  pub fn signaled(signal: i32) -> ExitCode {
    ExitCode {
      value: None,
      signal: Some(signal),
    }
  }
}

/// Raw outcome of one run as delivered by an executor.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
  /// Absent if execution could not even be observed
  pub exit_code: Option<ExitCode>,
  pub termination_reason: Option<TerminationReason>,
  /// CPU time in seconds
  pub cputime: Option<f64>,
  /// Wall time in seconds
  pub walltime: Option<f64>,
  /// Peak memory in bytes
  pub memory: Option<u64>,
  /// CPU energy in joules
  pub cpuenergy: Option<f64>,
  /// Further executor measurements by name
  pub extra_values: BTreeMap<String, serde_json::Value>,
}

/// Classifies completed runs for one benchmark.
#[derive(Clone)]
pub struct ResultClassifier {
  tool: ToolHandle,
  limits: ResourceLimits,
  rule: Arc<dyn CategoryRule>,
  visible_columns: BTreeSet<String>,
}

impl ResultClassifier {
  pub fn new(tool: ToolHandle, limits: ResourceLimits) -> ResultClassifier {
    ResultClassifier {
      tool,
      limits,
      rule: Arc::new(DefaultCategoryRule),
      visible_columns: BTreeSet::new(),
    }
  }

  /// Classifier for the benchmark's tool and limits, with the default
  /// categorization rule.
  pub fn for_benchmark(benchmark: &Benchmark) -> ResultClassifier {
    ResultClassifier::new(benchmark.tool.clone(), benchmark.limits)
  }

  /// Replaces the categorization rule.
  pub fn with_rule(mut self, rule: Arc<dyn CategoryRule>) -> ResultClassifier {
    self.rule = rule;
    self
  }

  /// Measurement keys that stay visible instead of being hidden behind
  /// an `@` prefix.
  pub fn with_visible_columns(
    mut self,
    columns: impl IntoIterator<Item = String>,
  ) -> ResultClassifier {
    self.visible_columns = columns.into_iter().collect();
    self
  }

  /// Stores the outcome on the run: measured values, the final status,
  /// the derived category, and extracted column values.
  pub fn set_result(&self, run: &mut Run, outcome: &RunOutcome) {
    if let Some(exit) = outcome.exit_code {
      match exit.signal {
        Some(signal) if signal != 0 => {
          run.values.insert("@exitsignal".to_string(), json!(signal));
        }
        _ => {
          if let Some(value) = exit.value {
            run.values.insert("@returnvalue".to_string(), json!(value));
          }
        }
      }
    }
    if let Some(cputime) = outcome.cputime {
      run.values.insert("cputime".to_string(), json!(cputime));
    }
    if let Some(walltime) = outcome.walltime {
      run.values.insert("walltime".to_string(), json!(walltime));
    }
    if let Some(memory) = outcome.memory {
      run.values.insert("memory".to_string(), json!(memory));
    }
    if let Some(cpuenergy) = outcome.cpuenergy {
      run.values.insert("cpuenergy".to_string(), json!(cpuenergy));
    }
    if let Some(reason) = &outcome.termination_reason {
      run
        .values
        .insert("@terminationreason".to_string(), json!(reason.as_str()));
    }
    for (key, value) in &outcome.extra_values {
      if self.visible_columns.contains(key) {
        run.values.insert(key.clone(), value.clone());
      } else {
        run.values.insert(format!("@{key}"), value.clone());
      }
    }

    let is_timeout = outcome
      .termination_reason
      .as_ref()
      .is_some_and(TerminationReason::is_timeout)
      || self.measured_timeout(outcome);

    // Tool output is not guaranteed to be UTF-8; keep the readable text.
    let output = match fs::read(&run.log_file) {
      Ok(bytes) => String::from_utf8_lossy(&bytes)
        .lines()
        .skip(LOG_HEADER_LINES)
        .map(str::to_string)
        .collect::<Vec<_>>(),
      Err(e) => {
        warn!("Cannot read log file: {e}");
        Vec::new()
      }
    };

    run.status = self.analyze_result(
      outcome.exit_code,
      &output,
      is_timeout,
      outcome.termination_reason.as_ref(),
    );
    run.category = self
      .rule
      .categorize(&run.expected_results, &run.status, &run.properties);

    // Column patterns were substituted at construction time.
    for column in &mut run.columns {
      column.value = self.tool.value_from_output(&output, &column.text);
    }
  }

  /// Whether the measured times exceed the configured limits, using the
  /// soft time limit if present, else the primary one.
  fn measured_timeout(&self, outcome: &RunOutcome) -> bool {
    fn exceeds(measured: Option<f64>, limit_s: Option<u64>) -> bool {
      match (measured, limit_s) {
        (Some(measured), Some(limit)) => measured > limit as f64,
        _ => false,
      }
    }

    let time_limit = self.limits.soft_time_s.or(self.limits.time_s);
    exceeds(outcome.cputime, time_limit) || exceeds(outcome.walltime, self.limits.wall_time_s)
  }

  fn analyze_result(
    &self,
    exit_code: Option<ExitCode>,
    output: &[String],
    is_timeout: bool,
    termination_reason: Option<&TerminationReason>,
  ) -> RunStatus {
    let mut tool_status = None;
    if let Some(exit) = exit_code {
      let verdict = self.tool.determine_result(
        exit.value.unwrap_or(0),
        exit.signal.unwrap_or(0),
        output,
        is_timeout,
      );
      // Unspecific verdicts say nothing about the property, so exit-code
      // information is the better answer.
      tool_status = Some(if verdict.is_unspecific() {
        match exit.signal {
          Some(6) => ToolStatus::Aborted,
          Some(11) => ToolStatus::Segfault,
          Some(15) => ToolStatus::Killed,
          Some(signal) if signal != 0 => ToolStatus::KilledBySignal(signal),
          _ => match exit.value {
            Some(value) if value != 0 => ToolStatus::ExitError(value),
            _ => ToolStatus::Verdict(verdict),
          },
        }
      } else {
        ToolStatus::Verdict(verdict)
      });
    }

    let condition = if is_timeout {
      Some(LimitCondition::Timeout)
    } else {
      termination_reason.map(TerminationReason::condition)
    };

    match (condition, tool_status) {
      (None, Some(tool)) => RunStatus::Tool(tool),
      (None, None) => RunStatus::Unobserved,
      (Some(condition), Some(tool)) if combines(&condition, &tool) => {
        RunStatus::Combined(condition, tool)
      }
      (Some(condition), _) => RunStatus::Condition(condition),
    }
  }
}

/// Whether a tool status is specific enough to keep next to a limit
/// condition. Kill statuses are expected during limit enforcement and
/// add nothing.
fn combines(condition: &LimitCondition, tool: &ToolStatus) -> bool {
  if let ToolStatus::Verdict(verdict) = tool {
    if verdict.is_unspecific() {
      return false;
    }
  }
  if matches!(tool, ToolStatus::Killed | ToolStatus::KilledBySignal(9)) {
    return false;
  }
  tool.to_string() != condition.to_string()
}

// =============================================================================
// Tests
// =============================================================================
