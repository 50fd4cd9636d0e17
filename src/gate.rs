//! Usability gate
//!
//! Decides whether a finished session carries enough activity to be worth
//! emitting. A rejection is a normal outcome, not an error.

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;

/// Why a session was discarded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum GateRejection {
    TooFewWords { words: u32, required: u32 },
    TooFewCharacters { characters: u32, required: u32 },
    TooShort { duration_secs: i64, required: f64 },
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateRejection::TooFewWords { words, required } => {
                write!(f, "{} words typed, {} required", words, required)
            }
            GateRejection::TooFewCharacters {
                characters,
                required,
            } => write!(f, "{} characters typed, {} required", characters, required),
            GateRejection::TooShort {
                duration_secs,
                required,
            } => write!(f, "session lasted {}s, {}s required", duration_secs, required),
        }
    }
}

/// Activity threshold applied to ended sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsabilityGate {
    config: GateConfig,
}

impl Default for UsabilityGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl UsabilityGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Check a session's totals.
    ///
    /// `duration_secs` is already truncated to whole seconds, so the default
    /// 1.5 s threshold only passes sessions of 2 s or more.
    pub fn check(
        &self,
        words: u32,
        characters: u32,
        duration_secs: i64,
    ) -> Result<(), GateRejection> {
        if words < self.config.min_words {
            return Err(GateRejection::TooFewWords {
                words,
                required: self.config.min_words,
            });
        }
        if characters < self.config.min_characters {
            return Err(GateRejection::TooFewCharacters {
                characters,
                required: self.config.min_characters,
            });
        }
        if (duration_secs as f64) < self.config.min_duration_secs {
            return Err(GateRejection::TooShort {
                duration_secs,
                required: self.config.min_duration_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_words_discarded() {
        let gate = UsabilityGate::default();
        assert!(matches!(
            gate.check(3, 500, 600),
            Err(GateRejection::TooFewWords { words: 3, .. })
        ));
    }

    #[test]
    fn test_minimum_session_passes() {
        let gate = UsabilityGate::default();
        assert_eq!(gate.check(4, 20, 2), Ok(()));
    }

    #[test]
    fn test_one_second_truncation_fails() {
        let gate = UsabilityGate::default();
        assert!(matches!(
            gate.check(4, 20, 1),
            Err(GateRejection::TooShort { duration_secs: 1, .. })
        ));
    }

    #[test]
    fn test_too_few_characters() {
        let gate = UsabilityGate::default();
        assert!(matches!(
            gate.check(4, 19, 10),
            Err(GateRejection::TooFewCharacters { characters: 19, .. })
        ));
    }

    #[test]
    fn test_custom_thresholds() {
        let gate = UsabilityGate::new(GateConfig {
            min_words: 1,
            min_characters: 1,
            min_duration_secs: 0.0,
        });
        assert_eq!(gate.check(1, 1, 0), Ok(()));
    }

    #[test]
    fn test_rejection_display() {
        let rejection = GateRejection::TooFewWords {
            words: 3,
            required: 4,
        };
        assert_eq!(rejection.to_string(), "3 words typed, 4 required");
    }
}
