//! Resolve benchmark definitions and inspect the resulting run plans

use std::path::Path;

use anyhow::{Context, Result};
use benchplan_core::{Benchmark, Config, ResourceLimits, ToolRegistry};
use chrono::Local;

use crate::SessionArgs;

/// Resolve a benchmark definition and summarize the result
pub fn cmd_resolve(args: &SessionArgs, json: bool) -> Result<()> {
  let benchmark = resolve_session(args)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&benchmark)?);
    return Ok(());
  }

  println!("Resolved Benchmark");
  println!("==================\n");

  println!("Name:          {}", benchmark.name);
  println!("Instance:      {}", benchmark.instance);
  println!("Definition:    {}", benchmark.benchmark_file.display());
  println!("Tool:          {} ({})", benchmark.tool_display_name(), benchmark.tool_module);
  println!("Output base:   {}", benchmark.output_base_name);
  println!("Log folder:    {}", benchmark.log_folder.display());
  println!("Threads:       {}", benchmark.num_of_threads);
  println!("Limits:        {}", format_limits(&benchmark.limits));
  println!("{}", benchmark.requirements);

  println!("\n--- Run Sets ---");
  let mut total = 0;
  for run_set in &benchmark.run_sets {
    let runs: usize = run_set.runs().count();
    if run_set.should_be_executed(&benchmark.config) {
      total += runs;
      println!(
        "{}. {} ({} runs in {} blocks)",
        run_set.index,
        run_set.full_name,
        runs,
        run_set.blocks.len()
      );
      for block in &run_set.blocks {
        println!("     block {}: {} runs", block.name, block.runs.len());
      }
    } else {
      println!("{}. {} (skipped by selection)", run_set.index, run_set.full_name);
    }
  }

  println!("\nTotal: {} runs to execute", total);
  Ok(())
}

/// List every concrete run of a resolved definition, per tasks block
pub fn cmd_tasks(args: &SessionArgs, executable: Option<&Path>) -> Result<()> {
  let mut benchmark = resolve_session(args)?;
  if let Some(executable) = executable {
    benchmark.executable = Some(executable.to_path_buf());
  }

  for run_set in &benchmark.run_sets {
    if !run_set.should_be_executed(&benchmark.config) {
      continue;
    }

    for block in &run_set.blocks {
      println!("[{} / block {}]", run_set.full_name, block.name);
      for run in &block.runs {
        println!("{}", run.identifier.display());
        if benchmark.executable.is_some() {
          let cmdline = run
            .cmdline(&benchmark)
            .with_context(|| format!("Failed to assemble command line for {}", run.identifier.display()))?;
          println!("  $ {}", cmdline.join(" "));
        }
      }
      println!();
    }
  }

  Ok(())
}

fn resolve_session(args: &SessionArgs) -> Result<Benchmark> {
  let registry = ToolRegistry::builtin();
  Benchmark::resolve(&args.file, session_config(args), &registry, Local::now())
    .with_context(|| format!("Failed to resolve {}", args.file.display()))
}

fn session_config(args: &SessionArgs) -> Config {
  let mut config = Config {
    name: args.name.clone(),
    timelimit: args.timelimit.clone(),
    walltimelimit: args.walltimelimit.clone(),
    memorylimit: args.memorylimit.clone(),
    corelimit: args.corelimit.clone(),
    num_of_threads: args.threads,
    selected_run_definitions: args.run_definitions.clone(),
    selected_sourcefile_sets: args.task_blocks.clone(),
    cpu_model: args.cpu_model.clone(),
    ..Config::default()
  };
  if let Some(output) = &args.output {
    config.output_path = output.clone();
  }
  config
}

/// Format resource limits in one line
fn format_limits(limits: &ResourceLimits) -> String {
  let mut parts = Vec::new();
  if let Some(time) = limits.time_s {
    parts.push(format!("cputime={time}s"));
  }
  if let Some(soft) = limits.soft_time_s {
    parts.push(format!("softtime={soft}s"));
  }
  if let Some(wall) = limits.wall_time_s {
    parts.push(format!("walltime={wall}s"));
  }
  if let Some(memory) = limits.memory_bytes {
    parts.push(format!("memory={} MB", memory / 1000 / 1000));
  }
  if let Some(cores) = limits.cpu_cores {
    parts.push(format!("cores={cores}"));
  }
  if parts.is_empty() {
    "none".to_string()
  } else {
    parts.join(", ")
  }
}
