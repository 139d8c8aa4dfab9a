//! Run sets: one run definition expanded over all its task blocks.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::document::{RunDefinitionDoc, TasksDoc};
use crate::error::{Error, Result};
use crate::model::{expand, Benchmark, Run};
use crate::paths;
use crate::vars::VarContext;

/// One named group of runs, produced by one tasks block.
#[derive(Debug, Clone, Serialize)]
pub struct SourcefileSet {
  /// Declared name, if any
  pub real_name: Option<String>,
  /// Never empty: the declared name or the block index
  pub name: String,
  pub index: usize,
  pub runs: Vec<Run>,
}

/// A run definition resolved against the benchmark: its options merged,
/// its task blocks expanded to concrete runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunSet {
  /// Declared name, if any
  pub real_name: Option<String>,
  /// Name including a single block's name, may be empty
  pub name: String,
  /// Benchmark name plus run-set name
  pub full_name: String,
  /// Position in the definition, starting at 1
  pub index: usize,
  pub options: Vec<String>,
  /// Declared property file pattern, before per-run resolution
  pub propertyfile: Option<String>,
  pub log_folder: PathBuf,
  /// Prefix distinguishing this run set's log files, `"name."` or empty
  pub log_prefix: String,
  pub result_files_folder: PathBuf,
  pub blocks: Vec<SourcefileSet>,
}

impl RunSet {
  pub(crate) fn new(
    doc: &RunDefinitionDoc,
    benchmark: &Benchmark,
    index: usize,
    global_blocks: &[TasksDoc],
  ) -> Result<RunSet> {
    let real_name = doc.name.clone().filter(|n| !n.is_empty());

    let mut log_prefix = String::new();
    let mut result_files_folder = benchmark.result_files_folder.clone();
    if let Some(name) = &real_name {
      log_prefix = format!("{name}.");
      result_files_folder = result_files_folder.join(name);
    }

    let mut options = benchmark.options.clone();
    options.extend(doc.options.iter().cloned());
    let propertyfile = doc
      .propertyfile
      .clone()
      .or_else(|| benchmark.propertyfile.clone());

    let runset_required: BTreeSet<String> = doc.requiredfiles.iter().cloned().collect();

    let mut run_set = RunSet {
      real_name,
      name: String::new(),
      full_name: String::new(),
      index,
      options,
      propertyfile,
      log_folder: benchmark.log_folder.clone(),
      log_prefix,
      result_files_folder,
      blocks: Vec::new(),
    };

    let blocks = run_set.extract_blocks(benchmark, global_blocks, &doc.tasks, &runset_required)?;
    run_set.blocks = blocks;

    let mut names: Vec<String> = Vec::new();
    if let Some(name) = &run_set.real_name {
      names.push(name.clone());
    }
    if let [only_block] = run_set.blocks.as_slice() {
      // a single block contributes its name to the run-set name
      if let Some(name) = &only_block.real_name {
        names.push(name.clone());
      }
    }
    run_set.name = names.join(".");
    run_set.full_name = if run_set.name.is_empty() {
      benchmark.name.clone()
    } else {
      format!("{}.{}", benchmark.name, run_set.name)
    };

    // Log files are named after the task basename only, so equal
    // basenames from different directories would collide.
    if run_set.should_be_executed(&benchmark.config) {
      let mut seen = HashSet::new();
      for run in run_set.runs() {
        let base = paths::basename(&run.identifier);
        if !seen.insert(base.clone()) {
          warn!(
            "Input file with name {base:?} appears twice in runset. \
             This could cause problems with equal logfile-names."
          );
        }
      }
    }

    Ok(run_set)
  }

  fn extract_blocks(
    &self,
    benchmark: &Benchmark,
    global_blocks: &[TasksDoc],
    own_blocks: &[TasksDoc],
    global_required: &BTreeSet<String>,
  ) -> Result<Vec<SourcefileSet>> {
    let selections = &benchmark.config.selected_sourcefile_sets;
    let mut blocks = Vec::new();

    for (index, block) in global_blocks.iter().chain(own_blocks).enumerate() {
      let real_name = block.name.clone().filter(|n| !n.is_empty());
      let match_name = real_name.clone().unwrap_or_else(|| index.to_string());
      if !selections.is_empty()
        && !selections
          .iter()
          .any(|sel| expand::wildcard_match(Some(&match_name), sel))
      {
        continue;
      }

      let mut required = global_required.clone();
      required.extend(block.requiredfiles.iter().cloned());

      let task_files = expand::collect_task_files(block, &benchmark.base_dir, &|pattern, base| {
        self.expand_pattern(benchmark, pattern, base, None)
      })?;

      let mut runs = Vec::new();
      for identifier in task_files {
        if identifier.extension().is_some_and(|ext| ext == "yml") {
          if !block.append.is_empty() {
            return Err(Error::Definition(
              "Cannot combine 'append' and task-definition files in the same tasks block."
                .to_string(),
            ));
          }
          let run = Run::from_task_definition(
            &identifier,
            &block.options,
            self,
            benchmark,
            block.propertyfile.as_deref(),
            &required,
          )?;
          if let Some(run) = run {
            runs.push(run);
          }
        } else {
          runs.push(Run::from_input_file(
            &identifier,
            &block.options,
            self,
            benchmark,
            block.propertyfile.as_deref(),
            &required,
            &block.append,
          ));
        }
      }
      for name in &block.withoutfile {
        runs.push(Run::without_file(
          name,
          &block.options,
          self,
          benchmark,
          block.propertyfile.as_deref(),
          &required,
        ));
      }

      blocks.push(SourcefileSet {
        real_name,
        name: match_name,
        index,
        runs,
      });
    }

    for selected in selections {
      if !blocks
        .iter()
        .any(|block| expand::wildcard_match(block.real_name.as_deref(), selected))
      {
        warn!("The selected tasks {selected:?} are not present in the input file, skipping them.");
      }
    }

    Ok(blocks)
  }

  /// Whether this run set matches the run-definition selection.
  pub fn should_be_executed(&self, config: &Config) -> bool {
    config.selected_run_definitions.is_empty()
      || config
        .selected_run_definitions
        .iter()
        .any(|sel| expand::wildcard_match(self.real_name.as_deref(), sel))
  }

  /// Substitutes variables in a pattern and expands it.
  pub fn expand_pattern(
    &self,
    benchmark: &Benchmark,
    pattern: &str,
    base_dir: &Path,
    task_file: Option<&Path>,
  ) -> Vec<PathBuf> {
    let mut ctx = self.var_context(benchmark);
    if let Some(file) = task_file {
      ctx = ctx.with_task_file(file);
    }
    let substituted = ctx.apply_one(pattern);
    if substituted != pattern {
      debug!("Expanded variables in expression {pattern:?} to {substituted:?}.");
    }
    let files = expand::glob_expand(&substituted, base_dir);
    if files.is_empty() {
      warn!("No files found matching {pattern:?}.");
    }
    files
  }

  /// The substitution keys of this run set.
  pub fn var_context(&self, benchmark: &Benchmark) -> VarContext {
    let mut ctx = VarContext::new();
    ctx.push("benchmark_name", benchmark.name.clone());
    ctx.push("benchmark_date", benchmark.instance.clone());
    let base_dir = if benchmark.base_dir.as_os_str().is_empty() {
      ".".to_string()
    } else {
      benchmark.base_dir.display().to_string()
    };
    ctx.push("benchmark_path", base_dir);
    ctx.push(
      "benchmark_path_abs",
      paths::absolute(&benchmark.base_dir).display().to_string(),
    );
    ctx.push("benchmark_file", paths::basename(&benchmark.benchmark_file));
    ctx.push(
      "benchmark_file_abs",
      paths::absolute(&benchmark.benchmark_file).display().to_string(),
    );
    let log_folder = self.log_folder.display().to_string();
    ctx.push(
      "logfile_path",
      if log_folder.is_empty() { ".".to_string() } else { log_folder },
    );
    ctx.push(
      "logfile_path_abs",
      paths::absolute(&self.log_folder).display().to_string(),
    );
    let name = self.real_name.clone().unwrap_or_default();
    ctx.push("rundefinition_name", name.clone());
    ctx.push("test_name", name);
    ctx
  }

  /// All runs of this run set, across its blocks.
  pub fn runs(&self) -> impl Iterator<Item = &Run> {
    self.blocks.iter().flat_map(|block| block.runs.iter())
  }

  pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
    self.blocks.iter_mut().flat_map(|block| block.runs.iter_mut())
  }
}

// =============================================================================
// Tests
// =============================================================================
