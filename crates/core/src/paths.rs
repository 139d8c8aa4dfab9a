//! Lexical path helpers for building the run graph.
//!
//! All helpers work purely on path text. Nothing here touches the
//! filesystem, so resolved definitions stay reproducible even when the
//! referenced files do not exist yet.

use std::path::{Component, Path, PathBuf};

/// Makes a path absolute against the current directory and folds
/// `.` and `..` segments lexically. An empty path counts as `.`.
pub fn absolute(path: &Path) -> PathBuf {
  let path = if path.as_os_str().is_empty() {
    Path::new(".")
  } else {
    path
  };
  let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
  normalize(&abs)
}

/// Folds `.` segments and applies `..` segments lexically.
///
/// Leading `..` segments of a relative path are kept, the parent of the
/// root is the root itself. An empty result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
  let mut out: Vec<Component> = Vec::new();
  for comp in path.components() {
    match comp {
      Component::CurDir => {}
      Component::ParentDir => match out.last() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir) => {}
        _ => out.push(comp),
      },
      c => out.push(c),
    }
  }
  if out.is_empty() {
    return PathBuf::from(".");
  }
  out.iter().collect()
}

/// Computes a relative path from `base` to `path`.
///
/// Both arguments are made absolute first, so the result is well defined
/// for any mix of relative and absolute inputs. Equal paths yield `.`.
pub fn relativize(path: &Path, base: &Path) -> PathBuf {
  let path = absolute(path);
  let base = absolute(base);

  let mut path_iter = path.components().peekable();
  let mut base_iter = base.components().peekable();
  while let (Some(a), Some(b)) = (path_iter.peek(), base_iter.peek()) {
    if a != b {
      break;
    }
    path_iter.next();
    base_iter.next();
  }

  let mut rel = PathBuf::new();
  for _ in base_iter {
    rel.push("..");
  }
  for comp in path_iter {
    rel.push(comp);
  }
  if rel.as_os_str().is_empty() {
    rel.push(".");
  }
  rel
}

/// The final path component as a string, or `""` for paths like `/`.
pub fn basename(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_folds_dots() {
    assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
    assert_eq!(normalize(Path::new("./a/b/")), PathBuf::from("a/b"));
    assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
  }

  #[test]
  fn test_normalize_keeps_leading_parents() {
    assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    assert_eq!(normalize(Path::new("a/../../x")), PathBuf::from("../x"));
  }

  #[test]
  fn test_normalize_parent_of_root_is_root() {
    assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
  }

  #[test]
  fn test_relativize_descends_and_climbs() {
    assert_eq!(
      relativize(Path::new("/a/b/c"), Path::new("/a")),
      PathBuf::from("b/c")
    );
    assert_eq!(
      relativize(Path::new("/a/b/c"), Path::new("/a/d")),
      PathBuf::from("../b/c")
    );
  }

  #[test]
  fn test_relativize_equal_paths() {
    assert_eq!(
      relativize(Path::new("/a/b"), Path::new("/a/b")),
      PathBuf::from(".")
    );
  }

  #[test]
  fn test_basename() {
    assert_eq!(basename(Path::new("dir/file.c")), "file.c");
    assert_eq!(basename(Path::new("/")), "");
  }
}
