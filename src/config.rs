//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `KFLUX_`-prefixed environment variables (`KFLUX_GATE__MIN_WORDS=6`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "KFLUX_";

/// What to do when a timer slot is opened while it still holds a pending timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse the open and keep the pending timer
    #[default]
    Reject,
    /// Drop the pending timer and start a fresh one
    Restart,
}

/// Minimum activity a session needs before its record is emitted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub min_words: u32,
    pub min_characters: u32,
    /// Compared against the session duration truncated to whole seconds
    pub min_duration_secs: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_words: 4,
            min_characters: 20,
            min_duration_secs: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub overlap_policy: OverlapPolicy,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gate: GateConfig,
    pub timers: TimerConfig,
}

impl EngineConfig {
    /// Defaults, then the given TOML file (if any), then `KFLUX_*` environment variables
    pub fn load_from(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(EngineError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config (used across the FFI boundary); missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.gate.min_duration_secs.is_finite() || self.gate.min_duration_secs < 0.0 {
            return Err(EngineError::Config(format!(
                "gate.min_duration_secs must be a non-negative number, got {}",
                self.gate.min_duration_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.gate.min_words, 4);
        assert_eq!(config.gate.min_characters, 20);
        assert_eq!(config.gate.min_duration_secs, 1.5);
        assert_eq!(config.timers.overlap_policy, OverlapPolicy::Reject);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[gate]\nmin_words = 6\n\n[timers]\noverlap_policy = \"restart\""
        )
        .unwrap();

        let config = EngineConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.gate.min_words, 6);
        assert_eq!(config.gate.min_characters, 20);
        assert_eq!(config.timers.overlap_policy, OverlapPolicy::Restart);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load_from(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{"gate": {"min_characters": 5}}"#).unwrap();
        assert_eq!(config.gate.min_characters, 5);
        assert_eq!(config.gate.min_words, 4);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result = EngineConfig::from_json(r#"{"gate": {"min_duration_secs": -1.0}}"#);
        assert!(result.is_err());
    }
}
