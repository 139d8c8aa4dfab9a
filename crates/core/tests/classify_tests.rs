//! End-to-end tests for result classification
//!
//! Resolves a benchmark with a custom tool adapter, writes executor log
//! files at the derived locations, and checks the final statuses and
//! categories.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use benchplan_core::results::Verdict;
use benchplan_core::{
  Benchmark, Category, Config, ExitCode, ResourceLimits, ResultClassifier, RunOutcome,
  TerminationReason, ToolAdapter, ToolHandle, ToolRegistry,
};
use common::{start_time, write};

/// Reads the verdict from marker lines in the tool output.
struct MarkerTool;

impl ToolAdapter for MarkerTool {
  fn name(&self) -> &str {
    "marker"
  }

  fn cmdline(
    &self,
    executable: &Path,
    options: &[String],
    input_files: &[PathBuf],
    _property_file: Option<&Path>,
    _limits: &ResourceLimits,
  ) -> Vec<String> {
    let mut args = vec![executable.display().to_string()];
    args.extend(options.iter().cloned());
    args.extend(input_files.iter().map(|f| f.display().to_string()));
    args
  }

  fn determine_result(
    &self,
    returnvalue: i32,
    _signal: i32,
    output: &[String],
    _is_timeout: bool,
  ) -> Verdict {
    for line in output {
      match line.trim() {
        "TRUE" => return Verdict::True,
        "FALSE" => return Verdict::False(None),
        _ => {}
      }
    }
    if returnvalue == 0 {
      Verdict::Done
    } else {
      Verdict::Error(None)
    }
  }
}

fn resolve_with_marker_tool(dir: &Path) -> Benchmark {
  write(
    dir,
    "props/unreach.prp",
    "CHECK( init(main()), LTL(G ! call(reach_error())) )\n",
  );
  write(dir, "tasks/a_true-unreach.c", "int main() { return 0; }\n");
  write(dir, "tasks/b_false-unreach.c", "int main() { return 1; }\n");
  write(
    dir,
    "bench.toml",
    r#"
tool = "marker"
timelimit = "90 s"
propertyfile = "props/unreach.prp"

[[rundefinition]]
name = "fast"

[[rundefinition.tasks]]
include = ["tasks/*.c"]
"#,
  );

  let mut registry = ToolRegistry::builtin();
  registry.register("tools.marker", ToolHandle::new(MarkerTool));

  // keep the derived output paths inside the fixture directory
  let config = Config {
    output_path: format!("{}/", dir.join("results").display()),
    ..Default::default()
  };
  Benchmark::resolve(&dir.join("bench.toml"), config, &registry, start_time())
    .expect("resolution should succeed")
}

fn write_executor_log(log_file: &Path, tool_lines: &[&str]) {
  fs::create_dir_all(log_file.parent().unwrap()).expect("Failed to create log folder");
  let mut text = String::new();
  for i in 0..6 {
    text.push_str(&format!("executor header line {i}\n"));
  }
  for line in tool_lines {
    text.push_str(line);
    text.push('\n');
  }
  fs::write(log_file, text).expect("Failed to write log file");
}

#[test]
fn test_resolved_runs_classify_end_to_end() {
  let dir = TempDir::new().unwrap();
  let mut benchmark = resolve_with_marker_tool(dir.path());
  let classifier = ResultClassifier::for_benchmark(&benchmark);

  // first run expects true and the tool says TRUE
  let run = &mut benchmark.run_sets[0].blocks[0].runs[0];
  assert!(run.log_file.starts_with(dir.path()));
  write_executor_log(&run.log_file, &["TRUE"]);
  classifier.set_result(
    run,
    &RunOutcome {
      exit_code: Some(ExitCode::returned(0)),
      cputime: Some(3.2),
      ..Default::default()
    },
  );
  assert_eq!(run.status.to_string(), "true");
  assert_eq!(run.category, Category::CorrectTrue);

  // second run expects false but the tool says TRUE
  let run = &mut benchmark.run_sets[0].blocks[0].runs[1];
  write_executor_log(&run.log_file, &["TRUE"]);
  classifier.set_result(
    run,
    &RunOutcome {
      exit_code: Some(ExitCode::returned(0)),
      ..Default::default()
    },
  );
  assert_eq!(run.status.to_string(), "true");
  assert_eq!(run.category, Category::Incorrect);
}

#[test]
fn test_timeout_overrides_late_verdict() {
  let dir = TempDir::new().unwrap();
  let mut benchmark = resolve_with_marker_tool(dir.path());
  let classifier = ResultClassifier::for_benchmark(&benchmark);

  let run = &mut benchmark.run_sets[0].blocks[0].runs[0];
  write_executor_log(&run.log_file, &["TRUE"]);
  classifier.set_result(
    run,
    &RunOutcome {
      exit_code: Some(ExitCode::signaled(9)),
      termination_reason: Some(TerminationReason::Walltime),
      walltime: Some(912.0),
      ..Default::default()
    },
  );

  // the verdict stays visible but the run no longer counts as correct
  assert_eq!(run.status.to_string(), "TIMEOUT (true)");
  assert_eq!(run.category, Category::Error);
}

#[test]
fn test_measured_timeout_against_declared_limit() {
  let dir = TempDir::new().unwrap();
  let mut benchmark = resolve_with_marker_tool(dir.path());
  assert_eq!(benchmark.limits.time_s, Some(90));
  let classifier = ResultClassifier::for_benchmark(&benchmark);

  let run = &mut benchmark.run_sets[0].blocks[0].runs[0];
  write_executor_log(&run.log_file, &[]);
  classifier.set_result(
    run,
    &RunOutcome {
      exit_code: Some(ExitCode::returned(0)),
      cputime: Some(95.0),
      ..Default::default()
    },
  );

  assert_eq!(run.status.to_string(), "TIMEOUT");
  assert_eq!(run.category, Category::Error);
}
