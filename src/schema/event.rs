//! keyboard.event.v1 schema definition
//!
//! One line per keyboard callback, stamped with the instant it happened:
//!
//! ```json
//! {"schema_version":"keyboard.event.v1","at":"2024-01-15T14:00:00.250Z","type":"burst_detected","length":3}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "keyboard.event.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Callback raised by the keyboard host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyboardEvent {
    /// A text field gained focus
    FocusIn,
    /// The focused text field lost focus
    FocusOut,
    /// Space or punctuation ended a word
    WordBoundary,
    CharacterTyped,
    KeyDown,
    KeyUp,
    Backspace,
    /// Run of consecutive backspaces (length >= 2)
    BurstDetected { length: u32 },
    /// Touch pressure reading
    PressureSample { value: i64 },
    PressureRemoved { value: i64 },
    WordOrSentenceDeleted,
    CharacterDeleted,
}

impl KeyboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            KeyboardEvent::FocusIn => "focus_in",
            KeyboardEvent::FocusOut => "focus_out",
            KeyboardEvent::WordBoundary => "word_boundary",
            KeyboardEvent::CharacterTyped => "character_typed",
            KeyboardEvent::KeyDown => "key_down",
            KeyboardEvent::KeyUp => "key_up",
            KeyboardEvent::Backspace => "backspace",
            KeyboardEvent::BurstDetected { .. } => "burst_detected",
            KeyboardEvent::PressureSample { .. } => "pressure_sample",
            KeyboardEvent::PressureRemoved { .. } => "pressure_removed",
            KeyboardEvent::WordOrSentenceDeleted => "word_or_sentence_deleted",
            KeyboardEvent::CharacterDeleted => "character_deleted",
        }
    }
}

/// A keyboard event with the instant it was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Schema version identifier
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// When the callback fired (UTC)
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: KeyboardEvent,
}

impl TimedEvent {
    pub fn new(at: DateTime<Utc>, event: KeyboardEvent) -> Self {
        TimedEvent {
            schema_version: SCHEMA_VERSION.to_string(),
            at,
            event,
        }
    }

    /// Validate the event payload
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        match self.event {
            KeyboardEvent::BurstDetected { length } if length < 2 => {
                Err(ValidationError::BurstTooShort(length))
            }
            KeyboardEvent::PressureSample { value } | KeyboardEvent::PressureRemoved { value }
                if value < 0 =>
            {
                Err(ValidationError::NegativePressure(value))
            }
            _ => Ok(()),
        }
    }
}

/// Validation errors for keyboard events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Backspace burst of length {0} is too short")]
    BurstTooShort(u32),

    #[error("Pressure value {0} is negative")]
    NegativePressure(i64),

    #[error("Event at {at} is earlier than the previous event at {previous}")]
    OutOfOrder {
        at: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_deserialize_unit_event() {
        let json = r#"{"schema_version":"keyboard.event.v1","at":"2024-01-15T14:00:00Z","type":"key_down"}"#;
        let event: TimedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, KeyboardEvent::KeyDown);
        assert_eq!(event.at, at());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_deserialize_event_with_payload() {
        let json = r#"{"at":"2024-01-15T14:00:00Z","type":"burst_detected","length":4}"#;
        let event: TimedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, KeyboardEvent::BurstDetected { length: 4 });
        assert_eq!(event.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_serialize_flattens_event() {
        let event = TimedEvent::new(at(), KeyboardEvent::PressureSample { value: 7 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pressure_sample");
        assert_eq!(json["value"], 7);
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = r#"{"at":"2024-01-15T14:00:00Z","type":"swipe"}"#;
        assert!(serde_json::from_str::<TimedEvent>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_short_burst() {
        let event = TimedEvent::new(at(), KeyboardEvent::BurstDetected { length: 1 });
        assert_eq!(event.validate(), Err(ValidationError::BurstTooShort(1)));
    }

    #[test]
    fn test_validate_rejects_negative_pressure() {
        let event = TimedEvent::new(at(), KeyboardEvent::PressureRemoved { value: -3 });
        assert_eq!(event.validate(), Err(ValidationError::NegativePressure(-3)));
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let mut event = TimedEvent::new(at(), KeyboardEvent::FocusIn);
        event.schema_version = "keyboard.event.v0".to_string();
        assert!(matches!(
            event.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        for event in [
            KeyboardEvent::FocusOut,
            KeyboardEvent::WordOrSentenceDeleted,
            KeyboardEvent::BurstDetected { length: 2 },
        ] {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json["type"], event.name());
        }
    }
}
