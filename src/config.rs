//! Settings loaded from `config/kh_settings.yaml`
//!
//! Every section and field has a default, so a partial file (or none at all)
//! is valid. `KH_CONFIG_DIR` overrides the directory the file is read from.

use crate::geometry::{ContainmentMode, DrawingConfig};
use crate::graph::{BuildConfig, ForceConfig, ViewportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "kh_settings.yaml";

static CONFIG: OnceLock<KhConfig> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid {section} settings: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

/// Spatial selection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Mode a fresh selection starts in
    pub default_mode: ContainmentMode,
}

/// Root settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KhConfig {
    pub viewport: ViewportConfig,
    pub layout: ForceConfig,
    pub selection: SelectionConfig,
    pub drawing: DrawingConfig,
    pub graph: BuildConfig,
}

impl KhConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                section: "viewport",
                reason,
            })
    }

    /// `$KH_CONFIG_DIR/kh_settings.yaml`, else `config/kh_settings.yaml`
    pub fn default_path() -> PathBuf {
        match std::env::var("KH_CONFIG_DIR") {
            Ok(dir) => PathBuf::from(dir).join(CONFIG_FILE),
            Err(_) => PathBuf::from("config").join(CONFIG_FILE),
        }
    }
}

/// Process-wide settings, loaded on first access.
///
/// Falls back to defaults when the file is missing or invalid.
pub fn global_config() -> &'static KhConfig {
    CONFIG.get_or_init(|| {
        let path = KhConfig::default_path();
        match KhConfig::load_from_file(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded settings");
                config
            }
            Err(e) => {
                warn!(error = %e, "using default settings");
                KhConfig::default()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_yaml_is_defaults() {
        assert_eq!(KhConfig::load_from_str("{}").unwrap(), KhConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
viewport:
  max_scale: 8.0
selection:
  default_mode: contained
layout:
  repulsion: 500
"#;
        let config = KhConfig::load_from_str(yaml).unwrap();
        assert_eq!(config.viewport.max_scale, 8.0);
        assert_eq!(config.viewport.min_scale, 0.2);
        assert_eq!(config.selection.default_mode, ContainmentMode::Contained);
        assert_eq!(config.layout.repulsion, 500.0);
        assert_eq!(config.layout.link_distance, 120.0);
        assert_eq!(config.drawing, DrawingConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let err = KhConfig::load_from_str("viewport: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_inverted_scale_bounds_rejected() {
        let err = KhConfig::load_from_str("viewport:\n  min_scale: 6.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { section: "viewport", .. }));
        assert!(err.to_string().contains("min_scale 6 exceeds max_scale 5"));
    }

    #[test]
    fn test_non_positive_scale_rejected() {
        let err = KhConfig::load_from_str("viewport:\n  min_scale: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = KhConfig::load_from_file(Path::new("/nonexistent/kh_settings.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_shipped_settings_match_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join(CONFIG_FILE);
        assert_eq!(KhConfig::load_from_file(&path).unwrap(), KhConfig::default());
    }
}
