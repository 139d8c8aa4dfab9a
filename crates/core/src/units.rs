//! Parsers for human-readable resource quantities.

/// Splits a value like `"15 min"` into its numeric part and unit suffix.
///
/// The unit is everything after the last digit, so a leading sign stays
/// with the number.
fn split_number_and_unit(value: &str) -> Result<(&str, &str), String> {
  let value = value.trim();
  if value.is_empty() {
    return Err("empty value".to_string());
  }
  let pos = value
    .rfind(|c: char| c.is_ascii_digit())
    .map(|i| i + 1)
    .unwrap_or(0);
  Ok((value[..pos].trim(), value[pos..].trim()))
}

fn parse_number(number: &str) -> Result<i64, String> {
  number
    .parse::<i64>()
    .map_err(|_| format!("invalid number {number:?}"))
}

/// Parses a duration into seconds.
///
/// A bare number is interpreted as seconds. Recognized suffixes are
/// `s`, `min`, `h` and `d`, optionally separated by whitespace.
pub fn parse_timespan(value: &str) -> Result<i64, String> {
  let (number, unit) = split_number_and_unit(value)?;
  let factor = match unit {
    "" | "s" => 1,
    "min" => 60,
    "h" => 60 * 60,
    "d" => 24 * 60 * 60,
    _ => return Err(format!("unknown unit {unit:?} (allowed are s, min, h, and d)")),
  };
  parse_number(number)?
    .checked_mul(factor)
    .ok_or_else(|| format!("value {number:?} is too large"))
}

/// Parses a byte quantity with a mandatory unit suffix.
///
/// Recognized suffixes are `B`, `kB`, `MB`, `GB` and `TB` with decimal
/// factors. A bare number is rejected so that a plain `"512"` cannot be
/// silently misread as bytes.
pub fn parse_memory(value: &str) -> Result<i64, String> {
  if value.trim().parse::<i64>().is_ok() {
    return Err(format!(
      "Memory limit must have a unit suffix, e.g., {:?}",
      format!("{} MB", value.trim())
    ));
  }
  let (number, unit) = split_number_and_unit(value)?;
  let factor: i64 = match unit {
    "B" => 1,
    "kB" => 1000,
    "MB" => 1000 * 1000,
    "GB" => 1000 * 1000 * 1000,
    "TB" => 1000 * 1000 * 1000 * 1000,
    _ => {
      return Err(format!(
        "unknown unit {unit:?} (allowed are B, kB, MB, GB, and TB)"
      ));
    }
  };
  parse_number(number)?
    .checked_mul(factor)
    .ok_or_else(|| format!("value {number:?} is too large"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_timespan_bare_number_is_seconds() {
    assert_eq!(parse_timespan("900"), Ok(900));
  }

  #[test]
  fn test_timespan_units() {
    assert_eq!(parse_timespan("900s"), Ok(900));
    assert_eq!(parse_timespan("15 min"), Ok(900));
    assert_eq!(parse_timespan("2h"), Ok(7200));
    assert_eq!(parse_timespan("1 d"), Ok(86400));
  }

  #[test]
  fn test_timespan_negative_parses() {
    // The caller rejects non-positive values with its own message.
    assert_eq!(parse_timespan("-5"), Ok(-5));
  }

  #[test]
  fn test_timespan_rejects_unknown_unit() {
    assert!(parse_timespan("10 parsecs").is_err());
    assert!(parse_timespan("ten").is_err());
    assert!(parse_timespan("").is_err());
  }

  #[test]
  fn test_timespan_overflow_is_rejected() {
    // 2^63 / 60 rounded up, so the unit conversion no longer fits
    let err = parse_timespan("153722867280912931 min").unwrap_err();
    assert!(err.contains("too large"), "got: {err}");
  }

  #[test]
  fn test_memory_units() {
    assert_eq!(parse_memory("512 MB"), Ok(512_000_000));
    assert_eq!(parse_memory("2GB"), Ok(2_000_000_000));
    assert_eq!(parse_memory("17 kB"), Ok(17_000));
    assert_eq!(parse_memory("100 B"), Ok(100));
  }

  #[test]
  fn test_memory_requires_unit_suffix() {
    let err = parse_memory("512").unwrap_err();
    assert!(err.contains("unit suffix"), "got: {err}");
    assert!(err.contains("512 MB"), "got: {err}");
  }

  #[test]
  fn test_memory_rejects_unknown_unit() {
    assert!(parse_memory("512 MiB").is_err());
  }

  #[test]
  fn test_memory_overflow_is_rejected() {
    let err = parse_memory("10000000000 GB").unwrap_err();
    assert!(err.contains("too large"), "got: {err}");
  }
}
