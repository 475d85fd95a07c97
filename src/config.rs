//! Discovery configuration
//!
//! Handles loading of discovery settings from TOML files. The extra
//! search-directory override comes in through the loader's environment
//! variable ([`crate::loader::LIBRARY_PATH_ENV`]), not through this type.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Inputs to a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Directories scanned before the platform defaults. May be empty.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Whether the platform default directories are additionally tried.
    #[serde(default = "default_true")]
    pub use_default_paths: bool,

    /// Bypass a cached already-bound session and re-run discovery.
    #[serde(default)]
    pub force_reload: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            use_default_paths: true,
            force_reload: false,
        }
    }
}

impl DiscoveryConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing discovery config")
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Add one search directory, highest priority first.
    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = DiscoveryConfig::default();
        assert!(c.search_paths.is_empty());
        assert!(c.use_default_paths);
        assert!(!c.force_reload);
    }

    #[test]
    fn test_from_toml() {
        let c = DiscoveryConfig::from_toml_str(
            r#"
            search_paths = ["/opt/media/lib"]
            use_default_paths = false
            "#,
        )
        .unwrap();
        assert_eq!(c.search_paths, vec![PathBuf::from("/opt/media/lib")]);
        assert!(!c.use_default_paths);
        assert!(!c.force_reload);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let c = DiscoveryConfig::from_toml_str("").unwrap();
        assert!(c.use_default_paths);
    }
}
