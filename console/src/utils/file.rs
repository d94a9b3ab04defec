//! File utility functions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Expand a path string to an absolute path.
///
/// - `~` and `~/path` resolve against the home directory
/// - relative paths resolve against the current directory
/// - absolute paths pass through unchanged
///
/// ```text
/// expand_path("~/.audience")   // -> /home/user/.audience
/// expand_path("./filters.json") // -> /current/dir/filters.json
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_path_trims_whitespace() {
        assert_eq!(expand_path("  /path/to/dir  "), PathBuf::from("/path/to/dir"));
    }

    #[test]
    fn test_expand_path_relative() {
        let result = expand_path("filters.json");
        assert!(result.is_absolute());
        assert!(result.ends_with("filters.json"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.audience");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".audience"));
    }

    #[test]
    fn test_expand_path_empty_is_cwd() {
        assert!(expand_path("").is_absolute());
    }

    #[test]
    fn test_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"a": 1}"#).unwrap();
        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["a"], 1);

        std::fs::write(&path, "not json").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));

        let missing = read_json::<serde_json::Value>(&dir.path().join("missing.json"));
        assert!(missing.is_err());
    }
}
