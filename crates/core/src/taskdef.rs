//! Schema of YAML task-definition files.
//!
//! A task definition bundles the input files of one task with the
//! properties to check and the expected verdict per property.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A single pattern or a list of patterns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
  One(String),
  Many(Vec<String>),
}

impl Patterns {
  pub fn as_vec(&self) -> Vec<String> {
    match self {
      Patterns::One(p) => vec![p.clone()],
      Patterns::Many(ps) => ps.clone(),
    }
  }
}

/// One property entry of a task definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskDefProperty {
  /// Path or pattern of the property file, relative to the task definition
  pub property_file: String,
  /// Expected verdict, must be a boolean when present
  #[serde(default)]
  pub expected_verdict: Option<serde_yaml::Value>,
  /// Violated subproperty for expected false verdicts
  #[serde(default)]
  pub subproperty: Option<String>,
}

impl TaskDefProperty {
  /// Returns the expected verdict as a boolean.
  ///
  /// Anything other than a boolean or null is rejected; the rendered
  /// offending value is returned for the error message.
  pub fn expected_verdict_bool(&self) -> std::result::Result<Option<bool>, String> {
    match &self.expected_verdict {
      None | Some(serde_yaml::Value::Null) => Ok(None),
      Some(serde_yaml::Value::Bool(b)) => Ok(Some(*b)),
      Some(other) => Err(scalar_repr(other)),
    }
  }
}

fn scalar_repr(value: &serde_yaml::Value) -> String {
  match value {
    serde_yaml::Value::String(s) => s.clone(),
    serde_yaml::Value::Number(n) => n.to_string(),
    serde_yaml::Value::Bool(b) => b.to_string(),
    other => format!("{other:?}"),
  }
}

/// The root of a task-definition file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskDefDoc {
  /// Format version, only 0.1 and 1.0 are supported
  pub format_version: Option<serde_yaml::Value>,
  pub input_files: Option<Patterns>,
  pub required_files: Option<Patterns>,
  pub properties: Vec<TaskDefProperty>,
}

impl TaskDefDoc {
  /// Parses a task definition from text. `file` names the source in errors.
  pub fn parse(text: &str, file: &str) -> Result<Self> {
    let doc: TaskDefDoc = serde_yaml::from_str(text).map_err(|e| Error::TaskDefinition {
      file: file.to_string(),
      reason: format!("invalid YAML: {e}"),
    })?;

    let version = doc.format_version.as_ref().and_then(version_string);
    match version.as_deref() {
      Some("0.1") | Some("1.0") => Ok(doc),
      Some(other) => Err(Error::TaskDefinition {
        file: file.to_string(),
        reason: format!("invalid format_version {other:?}"),
      }),
      None => Err(Error::TaskDefinition {
        file: file.to_string(),
        reason: "missing format_version".to_string(),
      }),
    }
  }

  /// Reads and parses a task-definition file.
  pub fn load(path: &Path) -> Result<Self> {
    let file = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| Error::TaskDefinition {
      file: file.clone(),
      reason: format!("cannot read: {e}"),
    })?;
    Self::parse(&text, &file)
  }

  pub fn input_file_patterns(&self) -> Vec<String> {
    self.input_files.as_ref().map(Patterns::as_vec).unwrap_or_default()
  }

  pub fn required_file_patterns(&self) -> Vec<String> {
    self.required_files.as_ref().map(Patterns::as_vec).unwrap_or_default()
  }
}

/// Renders the version value the way it was written, so both `"1.0"`
/// and the unquoted float `1.0` are accepted.
fn version_string(value: &serde_yaml::Value) -> Option<String> {
  match value {
    serde_yaml::Value::String(s) => Some(s.clone()),
    serde_yaml::Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        Some(i.to_string())
      } else {
        n.as_f64().map(|f| {
          if f.fract() == 0.0 {
            format!("{f:.1}")
          } else {
            f.to_string()
          }
        })
      }
    }
    _ => None,
  }
}

// =============================================================================
// Tests
// =============================================================================
