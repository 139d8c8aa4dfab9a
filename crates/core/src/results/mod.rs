//! Vocabulary for run results and their classification.
//!
//! A run ends with a [`RunStatus`]: either the tool's own verdict, a
//! violated resource limit, or both when the tool still produced output
//! after hitting a limit. Comparing the status against the expected
//! verdict of the checked property yields a [`Category`].

pub mod classify;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::paths;

// =============================================================================
// Verdicts
// =============================================================================

/// What a tool claims about the property it checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  /// The property holds
  True,
  /// The property is violated, optionally naming the violated subproperty
  False(Option<String>),
  /// The tool could not decide
  Unknown,
  /// The tool finished without checking a property
  Done,
  /// The tool failed, optionally with a short detail
  Error(Option<String>),
}

impl Verdict {
  /// True for verdicts that say nothing about the property, which may
  /// be refined with exit-code information.
  pub fn is_unspecific(&self) -> bool {
    matches!(self, Verdict::Unknown | Verdict::Done | Verdict::Error(None))
  }
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Verdict::True => write!(f, "true"),
      Verdict::False(None) => write!(f, "false"),
      Verdict::False(Some(sub)) => write!(f, "false({sub})"),
      Verdict::Unknown => write!(f, "unknown"),
      Verdict::Done => write!(f, "done"),
      Verdict::Error(None) => write!(f, "ERROR"),
      Verdict::Error(Some(detail)) => write!(f, "ERROR ({detail})"),
    }
  }
}

/// The tool-side status of a run, after refining unspecific verdicts
/// with exit-code information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
  Verdict(Verdict),
  /// Terminated by SIGABRT
  Aborted,
  /// Terminated by SIGSEGV
  Segfault,
  /// Terminated by SIGTERM
  Killed,
  /// Terminated by any other signal
  KilledBySignal(i32),
  /// Exited with a non-zero code and no specific verdict
  ExitError(i32),
}

impl fmt::Display for ToolStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ToolStatus::Verdict(v) => v.fmt(f),
      ToolStatus::Aborted => write!(f, "ABORTED"),
      ToolStatus::Segfault => write!(f, "SEGMENTATION FAULT"),
      ToolStatus::Killed => write!(f, "KILLED"),
      ToolStatus::KilledBySignal(signal) => write!(f, "KILLED BY SIGNAL {signal}"),
      ToolStatus::ExitError(code) => write!(f, "ERROR ({code})"),
    }
  }
}

/// A resource limit or executor condition that ended a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitCondition {
  Timeout,
  OutOfMemory,
  Killed,
  Failed,
  FilesCountLimit,
  FilesSizeLimit,
  /// An executor-specific reason passed through verbatim
  Other(String),
}

impl fmt::Display for LimitCondition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LimitCondition::Timeout => write!(f, "TIMEOUT"),
      LimitCondition::OutOfMemory => write!(f, "OUT OF MEMORY"),
      LimitCondition::Killed => write!(f, "KILLED"),
      LimitCondition::Failed => write!(f, "FAILED"),
      LimitCondition::FilesCountLimit => write!(f, "FILES-COUNT LIMIT"),
      LimitCondition::FilesSizeLimit => write!(f, "FILES-SIZE LIMIT"),
      LimitCondition::Other(reason) => write!(f, "{reason}"),
    }
  }
}

/// The final status of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunStatus {
  /// No result recorded yet, e.g. after an interrupt
  #[default]
  Unobserved,
  /// The run terminated regularly with the tool's status
  Tool(ToolStatus),
  /// A limit ended the run before the tool said anything useful
  Condition(LimitCondition),
  /// A limit ended the run but the tool still reported a specific status
  Combined(LimitCondition, ToolStatus),
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunStatus::Unobserved => Ok(()),
      RunStatus::Tool(tool) => tool.fmt(f),
      RunStatus::Condition(condition) => condition.fmt(f),
      RunStatus::Combined(condition, tool) => write!(f, "{condition} ({tool})"),
    }
  }
}

impl Serialize for RunStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

// =============================================================================
// Termination reasons
// =============================================================================

/// Why the executor terminated a run, as reported in the measurements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
  Cputime,
  CputimeSoft,
  Walltime,
  Memory,
  Killed,
  Failed,
  FilesCount,
  FilesSize,
  Other(String),
}

impl TerminationReason {
  pub fn parse(reason: &str) -> Self {
    match reason {
      "cputime" => TerminationReason::Cputime,
      "cputime-soft" => TerminationReason::CputimeSoft,
      "walltime" => TerminationReason::Walltime,
      "memory" => TerminationReason::Memory,
      "killed" => TerminationReason::Killed,
      "failed" => TerminationReason::Failed,
      "files-count" => TerminationReason::FilesCount,
      "files-size" => TerminationReason::FilesSize,
      other => TerminationReason::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      TerminationReason::Cputime => "cputime",
      TerminationReason::CputimeSoft => "cputime-soft",
      TerminationReason::Walltime => "walltime",
      TerminationReason::Memory => "memory",
      TerminationReason::Killed => "killed",
      TerminationReason::Failed => "failed",
      TerminationReason::FilesCount => "files-count",
      TerminationReason::FilesSize => "files-size",
      TerminationReason::Other(reason) => reason,
    }
  }

  /// The three time-based reasons all surface as a timeout.
  pub fn is_timeout(&self) -> bool {
    matches!(
      self,
      TerminationReason::Cputime | TerminationReason::CputimeSoft | TerminationReason::Walltime
    )
  }

  pub fn condition(&self) -> LimitCondition {
    match self {
      TerminationReason::Cputime | TerminationReason::CputimeSoft | TerminationReason::Walltime => {
        LimitCondition::Timeout
      }
      TerminationReason::Memory => LimitCondition::OutOfMemory,
      TerminationReason::Killed => LimitCondition::Killed,
      TerminationReason::Failed => LimitCondition::Failed,
      TerminationReason::FilesCount => LimitCondition::FilesCountLimit,
      TerminationReason::FilesSize => LimitCondition::FilesSizeLimit,
      TerminationReason::Other(reason) => LimitCondition::Other(reason.clone()),
    }
  }
}

// =============================================================================
// Properties and expected results
// =============================================================================

/// A property checked by the tool, identified by its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
  pub file: PathBuf,
  /// Name derived from the file stem, e.g. `unreach-call`
  pub name: String,
}

impl Property {
  pub fn from_file(file: &Path) -> Self {
    let name = file
      .file_stem()
      .map(|stem| stem.to_string_lossy().into_owned())
      .unwrap_or_default();
    Self {
      file: file.to_path_buf(),
      name,
    }
  }
}

/// The verdict a task declares for one property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpectedResult {
  pub verdict: Option<bool>,
  pub subproperty: Option<String>,
}

impl ExpectedResult {
  pub fn new(verdict: Option<bool>, subproperty: Option<String>) -> Self {
    Self { verdict, subproperty }
  }
}

impl fmt::Display for ExpectedResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.verdict {
      None => Ok(()),
      Some(true) => write!(f, "true"),
      Some(false) => match &self.subproperty {
        Some(sub) => write!(f, "false({sub})"),
        None => write!(f, "false"),
      },
    }
  }
}

/// Extracts expected verdicts encoded in a file name.
///
/// Every `_true-NAME` or `_false-NAME` part declares the expected
/// verdict for the property called `NAME`. Later occurrences of the
/// same name win.
pub fn expected_results_of_file(file: &Path) -> BTreeMap<String, ExpectedResult> {
  static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
  let Some(pattern) = PATTERN.get_or_init(|| Regex::new(r"_(true|false)-([a-zA-Z0-9-]+)").ok())
  else {
    return BTreeMap::new();
  };

  let name = paths::basename(file);
  let mut results = BTreeMap::new();
  for caps in pattern.captures_iter(&name) {
    let verdict = &caps[1] == "true";
    results.insert(caps[2].to_string(), ExpectedResult::new(Some(verdict), None));
  }
  results
}

// =============================================================================
// Categories
// =============================================================================

/// How a run status compares to the expected result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
  CorrectTrue,
  CorrectFalse,
  Incorrect,
  Unknown,
  Error,
}

impl Category {
  pub fn as_str(&self) -> &'static str {
    match self {
      Category::CorrectTrue => "correct-true",
      Category::CorrectFalse => "correct-false",
      Category::Incorrect => "incorrect",
      Category::Unknown => "unknown",
      Category::Error => "error",
    }
  }

  pub fn is_correct(&self) -> bool {
    matches!(self, Category::CorrectTrue | Category::CorrectFalse)
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Decides the category of a run from its status and expected results.
///
/// A seam for alternative scoring schemes; the default rule implements
/// plain verdict comparison.
pub trait CategoryRule: Send + Sync {
  fn categorize(
    &self,
    expected: &BTreeMap<PathBuf, ExpectedResult>,
    status: &RunStatus,
    properties: &[Property],
  ) -> Category;
}

/// Verdict comparison against the expected result of the first property.
///
/// Runs without a property or without an expected verdict cannot be
/// judged and are categorized as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCategoryRule;

impl CategoryRule for DefaultCategoryRule {
  fn categorize(
    &self,
    expected: &BTreeMap<PathBuf, ExpectedResult>,
    status: &RunStatus,
    properties: &[Property],
  ) -> Category {
    let RunStatus::Tool(ToolStatus::Verdict(verdict)) = status else {
      return Category::Error;
    };

    match verdict {
      Verdict::Unknown | Verdict::Done => return Category::Unknown,
      Verdict::Error(_) => return Category::Error,
      _ => {}
    }

    let Some(prop) = properties.first() else {
      return Category::Unknown;
    };
    let Some(expectation) = expected.get(&prop.file) else {
      return Category::Unknown;
    };
    let Some(expected_verdict) = expectation.verdict else {
      return Category::Unknown;
    };

    let correct = if expected_verdict {
      matches!(verdict, Verdict::True)
    } else if let Some(sub) = &expectation.subproperty {
      *verdict == Verdict::False(Some(sub.clone()))
    } else {
      matches!(verdict, Verdict::False(_))
    };

    if !correct {
      Category::Incorrect
    } else if expected_verdict {
      Category::CorrectTrue
    } else {
      Category::CorrectFalse
    }
  }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  fn tool(verdict: Verdict) -> RunStatus {
    RunStatus::Tool(ToolStatus::Verdict(verdict))
  }

  fn expectation(file: &str, verdict: Option<bool>, sub: Option<&str>) -> BTreeMap<PathBuf, ExpectedResult> {
    let mut map = BTreeMap::new();
    map.insert(
      PathBuf::from(file),
      ExpectedResult::new(verdict, sub.map(String::from)),
    );
    map
  }

  #[test]
  fn test_status_rendering() {
    assert_eq!(tool(Verdict::True).to_string(), "true");
    assert_eq!(tool(Verdict::False(Some("reach".into()))).to_string(), "false(reach)");
    assert_eq!(RunStatus::Tool(ToolStatus::Segfault).to_string(), "SEGMENTATION FAULT");
    assert_eq!(RunStatus::Tool(ToolStatus::ExitError(2)).to_string(), "ERROR (2)");
    assert_eq!(RunStatus::Condition(LimitCondition::Timeout).to_string(), "TIMEOUT");
    assert_eq!(
      RunStatus::Combined(
        LimitCondition::OutOfMemory,
        ToolStatus::Verdict(Verdict::False(Some("reach".into())))
      )
      .to_string(),
      "OUT OF MEMORY (false(reach))"
    );
    assert_eq!(RunStatus::Unobserved.to_string(), "");
  }

  #[test]
  fn test_unspecific_verdicts() {
    assert!(Verdict::Unknown.is_unspecific());
    assert!(Verdict::Done.is_unspecific());
    assert!(Verdict::Error(None).is_unspecific());
    assert!(!Verdict::Error(Some("x".into())).is_unspecific());
    assert!(!Verdict::True.is_unspecific());
    assert!(!Verdict::False(None).is_unspecific());
  }

  #[test]
  fn test_termination_reason_round_trip() {
    for reason in ["cputime", "cputime-soft", "walltime", "memory", "files-count"] {
      assert_eq!(TerminationReason::parse(reason).as_str(), reason);
    }
    let other = TerminationReason::parse("network");
    assert_eq!(other, TerminationReason::Other("network".into()));
    assert_eq!(other.condition(), LimitCondition::Other("network".into()));
  }

  #[test]
  fn test_expected_results_from_file_name() {
    let results = expected_results_of_file(Path::new("dir/prog_true-unreach-call.c"));
    assert_eq!(
      results.get("unreach-call"),
      Some(&ExpectedResult::new(Some(true), None))
    );

    let results =
      expected_results_of_file(Path::new("p_false-unreach-call_true-termination.i"));
    assert_eq!(results.len(), 2);
    assert_eq!(results.get("unreach-call").and_then(|e| e.verdict), Some(false));
    assert_eq!(results.get("termination").and_then(|e| e.verdict), Some(true));

    assert!(expected_results_of_file(Path::new("plain.c")).is_empty());
  }

  #[test]
  fn test_property_name_from_stem() {
    let prop = Property::from_file(Path::new("props/unreach-call.prp"));
    assert_eq!(prop.name, "unreach-call");
  }

  #[test]
  fn test_correct_true() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));
    let expected = expectation("p/unreach-call.prp", Some(true), None);
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::True), &[prop]),
      Category::CorrectTrue
    );
  }

  #[test]
  fn test_correct_false_requires_matching_subproperty() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/memsafety.prp"));
    let expected = expectation("p/memsafety.prp", Some(false), Some("valid-free"));

    assert_eq!(
      rule.categorize(
        &expected,
        &tool(Verdict::False(Some("valid-free".into()))),
        std::slice::from_ref(&prop)
      ),
      Category::CorrectFalse
    );
    assert_eq!(
      rule.categorize(
        &expected,
        &tool(Verdict::False(Some("valid-deref".into()))),
        std::slice::from_ref(&prop)
      ),
      Category::Incorrect
    );
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::False(None)), &[prop]),
      Category::Incorrect
    );
  }

  #[test]
  fn test_plain_false_accepts_any_subproperty() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));
    let expected = expectation("p/unreach-call.prp", Some(false), None);
    assert_eq!(
      rule.categorize(
        &expected,
        &tool(Verdict::False(Some("reach".into()))),
        &[prop]
      ),
      Category::CorrectFalse
    );
  }

  #[test]
  fn test_wrong_verdict() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));
    let expected = expectation("p/unreach-call.prp", Some(true), None);
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::False(None)), &[prop]),
      Category::Incorrect
    );
  }

  #[test]
  fn test_missing_expectation_is_unknown() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));

    assert_eq!(
      rule.categorize(&BTreeMap::new(), &tool(Verdict::True), std::slice::from_ref(&prop)),
      Category::Unknown
    );
    assert_eq!(
      rule.categorize(&BTreeMap::new(), &tool(Verdict::True), &[]),
      Category::Unknown
    );
    let expected = expectation("p/unreach-call.prp", None, None);
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::True), &[prop]),
      Category::Unknown
    );
  }

  #[test]
  fn test_non_verdict_statuses_are_errors() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));
    let expected = expectation("p/unreach-call.prp", Some(true), None);

    for status in [
      RunStatus::Condition(LimitCondition::Timeout),
      RunStatus::Combined(LimitCondition::Timeout, ToolStatus::Verdict(Verdict::True)),
      RunStatus::Tool(ToolStatus::Segfault),
      RunStatus::Unobserved,
      tool(Verdict::Error(Some("recursion".into()))),
    ] {
      assert_eq!(
        rule.categorize(&expected, &status, std::slice::from_ref(&prop)),
        Category::Error,
        "status {status:?}"
      );
    }
  }

  #[test]
  fn test_unknown_and_done_verdicts() {
    let rule = DefaultCategoryRule;
    let prop = Property::from_file(Path::new("p/unreach-call.prp"));
    let expected = expectation("p/unreach-call.prp", Some(true), None);
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::Unknown), std::slice::from_ref(&prop)),
      Category::Unknown
    );
    assert_eq!(
      rule.categorize(&expected, &tool(Verdict::Done), &[prop]),
      Category::Unknown
    );
  }
}
