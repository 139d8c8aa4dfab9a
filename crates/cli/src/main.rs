//! benchplan CLI - resolve benchmark definitions into concrete run plans

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{cmd_resolve, cmd_tasks, cmd_tools};
use logging::init_cli_logging;

#[derive(Parser)]
#[command(name = "benchplan")]
#[command(about = "Resolve benchmark definitions into concrete run plans")]
#[command(after_help = "\
QUICK START:
  benchplan resolve bench.toml          # Summarize the resolved benchmark
  benchplan resolve bench.toml --json   # Dump the full run graph as JSON
  benchplan tasks bench.toml            # List every concrete run
  benchplan tools                       # List known tool adapters

SELECTIONS:
  benchplan resolve bench.toml -r nightly       # Only one run definition
  benchplan tasks bench.toml -t 'unreach-*'     # Only matching tasks blocks")]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Selection and override flags shared by all commands that resolve a definition.
#[derive(Args)]
pub struct SessionArgs {
  /// Benchmark definition file (TOML)
  pub file: PathBuf,

  /// Execute only the named run definitions (repeatable, wildcards allowed)
  #[arg(short = 'r', long = "rundefinition", value_name = "NAME")]
  pub run_definitions: Vec<String>,

  /// Execute only tasks from the named tasks blocks (repeatable)
  #[arg(short = 't', long = "tasks", value_name = "NAME")]
  pub task_blocks: Vec<String>,

  /// Override the CPU time limit, e.g. "900 s" ("-1" to disable)
  #[arg(short = 'T', long, value_name = "LIMIT")]
  pub timelimit: Option<String>,

  /// Override the wall time limit ("-1" to disable)
  #[arg(short = 'W', long, value_name = "LIMIT")]
  pub walltimelimit: Option<String>,

  /// Override the memory limit, e.g. "8 GB" ("-1" to disable)
  #[arg(short = 'M', long, value_name = "LIMIT")]
  pub memorylimit: Option<String>,

  /// Override the CPU core limit ("-1" to disable)
  #[arg(short = 'c', long, value_name = "N")]
  pub corelimit: Option<String>,

  /// Number of parallel executions
  #[arg(short = 'N', long, value_name = "N")]
  pub threads: Option<u32>,

  /// Extra name suffix for this benchmark instance
  #[arg(long, value_name = "NAME")]
  pub name: Option<String>,

  /// Prefix for all output paths (default: "./results/")
  #[arg(short = 'o', long, value_name = "PATH")]
  pub output: Option<String>,

  /// Require a specific CPU model
  #[arg(long, value_name = "MODEL")]
  pub cpu_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve a benchmark definition and summarize the result
  #[command(after_help = "\
EXAMPLES:
  benchplan resolve doc/benchmark.toml
  benchplan resolve doc/benchmark.toml -r nightly -T '60 s'
  benchplan resolve doc/benchmark.toml --json > plan.json")]
  Resolve {
    #[command(flatten)]
    session: SessionArgs,

    /// Print the full resolved benchmark as JSON
    #[arg(long)]
    json: bool,
  },
  /// List every concrete run of a resolved definition, per tasks block
  #[command(after_help = "\
EXAMPLES:
  benchplan tasks doc/benchmark.toml
  benchplan tasks doc/benchmark.toml --cmdline ./mytool")]
  Tasks {
    #[command(flatten)]
    session: SessionArgs,

    /// Also print assembled command lines, using this tool executable
    #[arg(long, value_name = "EXECUTABLE")]
    cmdline: Option<PathBuf>,
  },
  /// List registered tool adapters
  Tools,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_cli_logging(cli.verbose);

  match cli.command {
    Commands::Resolve { session, json } => cmd_resolve(&session, json),
    Commands::Tasks { session, cmdline } => cmd_tasks(&session, cmdline.as_deref()),
    Commands::Tools => cmd_tools(),
  }
}
