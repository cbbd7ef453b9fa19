use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::ResponseKey;
use crate::error::{PrepError, Result};

/// Pipeline configuration. Every field has a compiled-in default so the tool
/// runs without a config file; a TOML file overrides individual sections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keys: KeyCodes,
    pub selection: SelectionConfig,
    pub audit: AuditConfig,
}

/// Raw response codes emitted by the task software for the three keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyCodes {
    pub left: u16,
    pub right: u16,
    pub space: u16,
}

impl Default for KeyCodes {
    fn default() -> Self {
        Self {
            left: 33,
            right: 36,
            space: 57,
        }
    }
}

impl KeyCodes {
    /// Classify a raw response code. Codes outside the three known keys
    /// return `None` and are treated as incorrect responses downstream.
    pub fn classify(&self, code: u16) -> Option<ResponseKey> {
        if code == self.left {
            Some(ResponseKey::Left)
        } else if code == self.right {
            Some(ResponseKey::Right)
        } else if code == self.space {
            Some(ResponseKey::Space)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Trial count a session must reach to count as a complete attempt.
    pub trials_per_session: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            trials_per_session: 114,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Error rate above which a subject is flagged (reporting only).
    pub error_rate_threshold: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: 0.33,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResponseKey;

    #[test]
    fn default_key_codes_classify() {
        let keys = KeyCodes::default();
        assert_eq!(keys.classify(33), Some(ResponseKey::Left));
        assert_eq!(keys.classify(36), Some(ResponseKey::Right));
        assert_eq!(keys.classify(57), Some(ResponseKey::Space));
        assert_eq!(keys.classify(12), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[audit]\nerror_rate_threshold = 0.5\n").unwrap();
        assert_eq!(config.selection.trials_per_session, 114);
        assert_eq!(config.keys.left, 33);
        assert!((config.audit.error_rate_threshold - 0.5).abs() < f64::EPSILON);
    }
}
