//! Shared fixture helpers for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

/// Writes a fixture file, creating parent directories as needed.
#[allow(dead_code)]
pub fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
  let path = dir.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).expect("Failed to create fixture directory");
  }
  fs::write(&path, text).expect("Failed to write fixture file");
  path
}

/// A fixed session start so derived output paths are deterministic.
#[allow(dead_code)]
pub fn start_time() -> DateTime<Local> {
  Local.with_ymd_and_hms(2024, 5, 17, 14, 30, 0).unwrap()
}
