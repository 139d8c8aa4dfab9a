//! Hardware requirements a host must satisfy to execute a benchmark.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::document::RequireDoc;
use crate::error::{Error, Result};
use crate::limits::ResourceLimits;
use crate::units;

/// Declared hardware requirements, falling back to the resource limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
  pub cpu_model: Option<String>,
  pub cpu_cores: Option<u32>,
  pub memory_bytes: Option<u64>,
}

impl fmt::Display for Requirements {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Requirements:")?;
    let mut any = false;
    if let Some(model) = &self.cpu_model {
      write!(f, " CPU='{model}'")?;
      any = true;
    }
    if let Some(cores) = self.cpu_cores {
      write!(f, " Cores={cores}")?;
      any = true;
    }
    if let Some(memory) = self.memory_bytes {
      write!(f, " Memory={} MB", memory / 1000 / 1000)?;
      any = true;
    }
    if !any {
      write!(f, " None")?;
    }
    Ok(())
  }
}

/// Parses a required memory value.
///
/// A bare number is read as MB for backwards compatibility and warned
/// about; anything else must carry a unit suffix.
fn parse_required_memory(value: &str) -> Result<u64> {
  if let Ok(mb) = value.trim().parse::<i64>() {
    warn!(
      "Value {value:?} for memory requirement interpreted as MB for backwards compatibility, \
       specify a unit to make this unambiguous."
    );
    let bytes = mb.checked_mul(1000 * 1000).ok_or_else(|| {
      Error::InvalidRequirement(format!("memory {value:?}: value is too large"))
    })?;
    return Ok(bytes.max(0) as u64);
  }
  let bytes = units::parse_memory(value)
    .map_err(|reason| Error::InvalidRequirement(format!("memory {value:?}: {reason}")))?;
  Ok(bytes.max(0) as u64)
}

/// Merges all `require` declarations of a definition.
///
/// Each aspect may be declared at most once. Cores and memory fall back
/// to the resource limits, and a configured CPU model overrides the
/// declared one.
pub fn resolve_requirements(
  declarations: &[RequireDoc],
  limits: &ResourceLimits,
  config: &Config,
) -> Result<Requirements> {
  let mut req = Requirements::default();

  for decl in declarations {
    if let Some(model) = decl.cpu_model.as_deref().filter(|m| !m.is_empty()) {
      if req.cpu_model.is_some() {
        return Err(Error::DuplicateRequirement("CPU model"));
      }
      req.cpu_model = Some(model.to_string());
    }

    if let Some(cores) = decl.cpu_cores.as_deref().filter(|c| !c.is_empty()) {
      if req.cpu_cores.is_some() {
        return Err(Error::DuplicateRequirement("CPU cores"));
      }
      let parsed = cores.trim().parse::<i64>().map_err(|_| {
        Error::InvalidRequirement(format!("Invalid value {cores:?} for required CPU cores"))
      })?;
      if parsed <= 0 || u32::try_from(parsed).is_err() {
        return Err(Error::InvalidRequirement(format!(
          "Invalid value {parsed} for required CPU cores"
        )));
      }
      req.cpu_cores = Some(parsed as u32);
    }

    if let Some(memory) = decl.memory.as_deref().filter(|m| !m.is_empty()) {
      if req.memory_bytes.is_some() {
        return Err(Error::DuplicateRequirement("memory"));
      }
      req.memory_bytes = Some(parse_required_memory(memory)?);
    }
  }

  if req.cpu_cores.is_none() {
    req.cpu_cores = limits.cpu_cores;
  }
  if req.memory_bytes.is_none() {
    req.memory_bytes = limits.memory_bytes;
  }
  if config.cpu_model.is_some() {
    req.cpu_model = config.cpu_model.clone();
  }

  if req.cpu_cores.is_some_and(|c| c == 0) {
    return Err(Error::InvalidRequirement(
      "Invalid value 0 for required CPU cores".to_string(),
    ));
  }
  if req.memory_bytes.is_some_and(|m| m == 0) {
    return Err(Error::InvalidRequirement(
      "Invalid value 0 for required memory".to_string(),
    ));
  }

  Ok(req)
}

// =============================================================================
// Tests
// =============================================================================
