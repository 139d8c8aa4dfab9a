//! Benchmark definition resolution and run-result classification.
//!
//! This crate turns a benchmark definition file into the full run graph
//! (benchmark, run sets, task blocks, runs) and classifies completed
//! runs into statuses and categories:
//! - [`Benchmark::resolve`] builds the graph from a definition document
//! - [`ResultClassifier`] maps raw executor outcomes to final results
//!
//! Executing runs is out of scope; an executor consumes the graph and
//! feeds outcomes back through the classifier.

pub mod config;
pub mod document;
pub mod error;
pub mod limits;
pub mod model;
pub mod paths;
pub mod requirements;
pub mod results;
pub mod taskdef;
pub mod tool;
pub mod units;
pub mod vars;

pub use config::Config;
pub use error::{Error, Result};
pub use limits::ResourceLimits;
pub use model::{Benchmark, Run, RunSet, SourcefileSet};
pub use requirements::Requirements;
pub use results::classify::{ExitCode, ResultClassifier, RunOutcome};
pub use results::{Category, RunStatus, TerminationReason};
pub use tool::{ToolAdapter, ToolHandle, ToolRegistry};
