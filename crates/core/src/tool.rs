//! Tool adapters describe how to invoke a tool and read its results.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, Result};
use crate::limits::ResourceLimits;
use crate::paths;
use crate::results::Verdict;

/// Everything the resolver needs to know about one tool.
///
/// Implementations must be side-effect free: `cmdline` builds the
/// argument list without running anything, and `determine_result` only
/// inspects the recorded exit information and output.
pub trait ToolAdapter: Send + Sync {
  /// Short human-readable tool name.
  fn name(&self) -> &str;

  /// Builds the command line for one run.
  ///
  /// Paths have already been made relative to [`working_directory`]
  /// unless they were declared absolute.
  ///
  /// [`working_directory`]: ToolAdapter::working_directory
  fn cmdline(
    &self,
    executable: &Path,
    options: &[String],
    input_files: &[PathBuf],
    property_file: Option<&Path>,
    limits: &ResourceLimits,
  ) -> Vec<String>;

  /// Maps exit value, signal and output lines to the tool's verdict.
  fn determine_result(
    &self,
    returnvalue: i32,
    signal: i32,
    output: &[String],
    is_timeout: bool,
  ) -> Verdict;

  /// Files belonging to the tool installation besides the executable.
  fn program_files(&self, _executable: &Path) -> Vec<PathBuf> {
    Vec::new()
  }

  /// Directory the tool must be invoked from.
  fn working_directory(&self, _executable: &Path) -> PathBuf {
    PathBuf::from(".")
  }

  /// Extra environment variables for the tool process.
  fn environment(&self, _executable: &Path) -> BTreeMap<String, String> {
    BTreeMap::new()
  }

  /// Extracts one column value from the output, `None` if absent.
  fn value_from_output(&self, _output: &[String], _pattern: &str) -> Option<String> {
    None
  }
}

/// A shared, cloneable handle to a tool adapter.
#[derive(Clone)]
pub struct ToolHandle(Arc<dyn ToolAdapter>);

impl ToolHandle {
  pub fn new(adapter: impl ToolAdapter + 'static) -> Self {
    Self(Arc::new(adapter))
  }
}

impl Deref for ToolHandle {
  type Target = dyn ToolAdapter;

  fn deref(&self) -> &Self::Target {
    self.0.as_ref()
  }
}

impl fmt::Debug for ToolHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ToolHandle({})", self.name())
  }
}

impl Default for ToolHandle {
  fn default() -> Self {
    Self::new(GenericTool)
  }
}

/// Maps tool names from definitions to adapters.
///
/// Plain names live in the `tools` namespace; names containing a dot
/// are taken as full module keys for externally registered adapters.
pub struct ToolRegistry {
  tools: BTreeMap<String, ToolHandle>,
}

impl ToolRegistry {
  /// A registry with the built-in adapters.
  pub fn builtin() -> Self {
    let mut registry = Self {
      tools: BTreeMap::new(),
    };
    registry.register("tools.generic", ToolHandle::new(GenericTool));
    registry
  }

  pub fn register(&mut self, module: impl Into<String>, handle: ToolHandle) {
    self.tools.insert(module.into(), handle);
  }

  /// Resolves a tool name to its module key and adapter.
  pub fn resolve(&self, name: &str) -> Result<(String, ToolHandle)> {
    let module = if name.contains('.') {
      name.to_string()
    } else {
      format!("tools.{name}")
    };
    match self.tools.get(&module) {
      Some(handle) => Ok((module, handle.clone())),
      None => Err(Error::UnknownTool(name.to_string())),
    }
  }

  /// All registered module keys, sorted.
  pub fn modules(&self) -> impl Iterator<Item = &str> {
    self.tools.keys().map(String::as_str)
  }
}

impl Default for ToolRegistry {
  fn default() -> Self {
    Self::builtin()
  }
}

/// Builds the command line for one run, with all paths made relative
/// to the tool's working directory.
///
/// A bare executable name gets a `./` prefix so the command never
/// resolves through `PATH`. Adapters must not produce empty arguments.
pub fn cmdline_for_run(
  tool: &ToolHandle,
  executable: &Path,
  options: &[String],
  input_files: &[PathBuf],
  propertyfile: Option<&Path>,
  limits: &ResourceLimits,
) -> Result<Vec<String>> {
  let working_directory = tool.working_directory(executable);
  let relpath = |path: &Path| -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      paths::relativize(path, &working_directory)
    }
  };

  let mut rel_executable = relpath(executable);
  if !rel_executable
    .to_string_lossy()
    .contains(std::path::MAIN_SEPARATOR)
  {
    rel_executable = Path::new(".").join(rel_executable);
  }

  let rel_files: Vec<PathBuf> = input_files.iter().map(|f| relpath(f)).collect();
  let rel_property = propertyfile.map(|p| relpath(p));

  let args = tool.cmdline(
    &rel_executable,
    options,
    &rel_files,
    rel_property.as_deref(),
    limits,
  );
  if args.iter().any(String::is_empty) {
    return Err(Error::Tool(format!(
      "cmdline contains empty argument: {args:?}"
    )));
  }
  Ok(args)
}

// =============================================================================
// Built-in adapters
// =============================================================================

/// Fallback adapter for tools without their own adapter.
///
/// Invokes the executable with the options followed by the input files
/// and reports `done` on exit code zero.
pub struct GenericTool;

impl ToolAdapter for GenericTool {
  fn name(&self) -> &str {
    "generic"
  }

  fn cmdline(
    &self,
    executable: &Path,
    options: &[String],
    input_files: &[PathBuf],
    _property_file: Option<&Path>,
    _limits: &ResourceLimits,
  ) -> Vec<String> {
    let mut args = vec![executable.to_string_lossy().into_owned()];
    args.extend(options.iter().cloned());
    args.extend(input_files.iter().map(|f| f.to_string_lossy().into_owned()));
    args
  }

  fn determine_result(
    &self,
    returnvalue: i32,
    _signal: i32,
    _output: &[String],
    _is_timeout: bool,
  ) -> Verdict {
    if returnvalue == 0 {
      Verdict::Done
    } else {
      Verdict::Error(None)
    }
  }

  fn value_from_output(&self, output: &[String], pattern: &str) -> Option<String> {
    let regex = Regex::new(pattern).ok()?;
    for line in output {
      if let Some(caps) = regex.captures(line) {
        let matched = caps.get(1).or_else(|| caps.get(0));
        return matched.map(|m| m.as_str().to_string());
      }
    }
    None
  }
}

// =============================================================================
// Tests
// =============================================================================
