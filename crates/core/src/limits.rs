//! Resource limits for runs, merged from the definition and overrides.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::document::BenchmarkDoc;
use crate::error::{Error, Result};
use crate::units;

/// The effective limits every run of a benchmark is executed under.
///
/// `time_s` is the hard CPU time limit. When the definition declares a
/// larger hard limit than the soft one, the soft value moves to
/// `soft_time_s` and `time_s` carries the hard value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
  pub time_s: Option<u64>,
  pub soft_time_s: Option<u64>,
  pub wall_time_s: Option<u64>,
  pub memory_bytes: Option<u64>,
  pub cpu_cores: Option<u32>,
}

fn parse_count(value: &str) -> std::result::Result<i64, String> {
  value
    .trim()
    .parse::<i64>()
    .map_err(|_| format!("invalid number {value:?}"))
}

/// Applies the command-line override, then parses and validates one limit.
///
/// A command-line value of `-1` removes the limit entirely.
fn limit_value(
  name: &'static str,
  doc_value: Option<&str>,
  cli_value: Option<&str>,
  parse: impl Fn(&str) -> std::result::Result<i64, String>,
) -> Result<Option<i64>> {
  let value = match cli_value {
    Some(cli) if cli.trim() == "-1" => None,
    Some(cli) => Some(cli),
    None => doc_value,
  };
  let Some(value) = value else {
    return Ok(None);
  };

  let parsed = parse(value).map_err(|reason| Error::InvalidLimit {
    name,
    value: value.to_string(),
    reason,
  })?;
  if parsed <= 0 {
    return Err(Error::InvalidLimit {
      name,
      value: value.to_string(),
      reason: "needs to be a positive number (or -1 on the command line for disabling it)"
        .to_string(),
    });
  }
  Ok(Some(parsed))
}

/// Resolves all limits of a definition against command-line overrides.
///
/// The time override applies to both the soft and the hard time limit,
/// so overriding collapses them into a single limit.
pub fn resolve_limits(doc: &BenchmarkDoc, config: &Config) -> Result<ResourceLimits> {
  let mut time = limit_value(
    "Time",
    doc.timelimit.as_deref(),
    config.timelimit.as_deref(),
    units::parse_timespan,
  )?;
  let hard_time = limit_value(
    "Hard time",
    doc.hardtimelimit.as_deref(),
    config.timelimit.as_deref(),
    units::parse_timespan,
  )?;
  let wall_time = limit_value(
    "Wall time",
    doc.walltimelimit.as_deref(),
    config.walltimelimit.as_deref(),
    units::parse_timespan,
  )?;
  let memory = limit_value(
    "Memory",
    doc.memlimit.as_deref(),
    config.memorylimit.as_deref(),
    units::parse_memory,
  )?;
  let cores = limit_value(
    "Core",
    doc.cpu_cores.as_deref(),
    config.corelimit.as_deref(),
    parse_count,
  )?;

  let mut soft_time = None;
  if let Some(hard) = hard_time {
    match time {
      Some(soft) if hard < soft => {
        warn!("Hard timelimit {hard} is smaller than timelimit {soft}, ignoring the former.");
      }
      Some(soft) if hard > soft => {
        soft_time = Some(soft);
        time = Some(hard);
      }
      Some(_) => {}
      None => time = Some(hard),
    }
  }

  let cpu_cores = match cores {
    Some(n) => Some(u32::try_from(n).map_err(|_| Error::InvalidLimit {
      name: "Core",
      value: n.to_string(),
      reason: "number too large".to_string(),
    })?),
    None => None,
  };

  Ok(ResourceLimits {
    time_s: time.map(|v| v as u64),
    soft_time_s: soft_time.map(|v| v as u64),
    wall_time_s: wall_time.map(|v| v as u64),
    memory_bytes: memory.map(|v| v as u64),
    cpu_cores,
  })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(
    timelimit: Option<&str>,
    hardtimelimit: Option<&str>,
    walltimelimit: Option<&str>,
    memlimit: Option<&str>,
  ) -> BenchmarkDoc {
    BenchmarkDoc {
      timelimit: timelimit.map(String::from),
      hardtimelimit: hardtimelimit.map(String::from),
      walltimelimit: walltimelimit.map(String::from),
      memlimit: memlimit.map(String::from),
      ..Default::default()
    }
  }

  #[test]
  fn test_limits_parse_with_units() {
    let limits = resolve_limits(
      &doc(Some("15 min"), None, Some("1h"), Some("7 GB")),
      &Config::default(),
    )
    .unwrap();
    assert_eq!(limits.time_s, Some(900));
    assert_eq!(limits.wall_time_s, Some(3600));
    assert_eq!(limits.memory_bytes, Some(7_000_000_000));
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_cli_override_wins() {
    let config = Config {
      timelimit: Some("60".to_string()),
      ..Default::default()
    };
    let limits = resolve_limits(&doc(Some("900"), None, None, None), &config).unwrap();
    assert_eq!(limits.time_s, Some(60));
  }

  #[test]
  fn test_cli_minus_one_removes_limit() {
    let config = Config {
      timelimit: Some("-1".to_string()),
      ..Default::default()
    };
    let limits = resolve_limits(&doc(Some("900"), Some("960"), None, None), &config).unwrap();
    assert_eq!(limits.time_s, None);
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_zero_limit_is_rejected() {
    let err = resolve_limits(&doc(Some("0"), None, None, None), &Config::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidLimit { name: "Time", .. }));
    assert!(err.to_string().contains("positive number"));
  }

  #[test]
  fn test_memory_without_unit_is_rejected() {
    let err = resolve_limits(&doc(None, None, None, Some("512")), &Config::default()).unwrap_err();
    assert!(err.to_string().contains("unit suffix"), "got: {err}");
  }

  #[test]
  fn test_smaller_hard_time_is_ignored() {
    let limits =
      resolve_limits(&doc(Some("900"), Some("600"), None, None), &Config::default()).unwrap();
    assert_eq!(limits.time_s, Some(900));
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_larger_hard_time_demotes_soft_limit() {
    let limits =
      resolve_limits(&doc(Some("900"), Some("960"), None, None), &Config::default()).unwrap();
    assert_eq!(limits.time_s, Some(960));
    assert_eq!(limits.soft_time_s, Some(900));
  }

  #[test]
  fn test_equal_hard_time_is_dropped() {
    let limits =
      resolve_limits(&doc(Some("900"), Some("900"), None, None), &Config::default()).unwrap();
    assert_eq!(limits.time_s, Some(900));
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_hard_time_alone_becomes_the_limit() {
    let limits =
      resolve_limits(&doc(None, Some("960"), None, None), &Config::default()).unwrap();
    assert_eq!(limits.time_s, Some(960));
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_time_override_collapses_hard_and_soft() {
    let config = Config {
      timelimit: Some("60".to_string()),
      ..Default::default()
    };
    let limits = resolve_limits(&doc(Some("900"), Some("960"), None, None), &config).unwrap();
    assert_eq!(limits.time_s, Some(60));
    assert_eq!(limits.soft_time_s, None);
  }

  #[test]
  fn test_core_limit() {
    let doc = BenchmarkDoc {
      cpu_cores: Some("4".to_string()),
      ..Default::default()
    };
    let limits = resolve_limits(&doc, &Config::default()).unwrap();
    assert_eq!(limits.cpu_cores, Some(4));
  }
}
