//! Decoding of recorded keyboard event streams
//!
//! Streams arrive either as a JSON array or as NDJSON (one event per line,
//! blank lines ignored).

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::schema::event::{TimedEvent, ValidationError};

/// Parser and checker for keyboard.event.v1 streams
pub struct EventAdapter;

impl EventAdapter {
    /// Parse a JSON string containing an array of events
    pub fn parse_array(json: &str) -> Result<Vec<TimedEvent>, EngineError> {
        let events: Vec<TimedEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing events
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TimedEvent>, EngineError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TimedEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either format, sniffing the first non-whitespace character
    pub fn parse(input: &str) -> Result<Vec<TimedEvent>, EngineError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of events, returning only the failures.
    ///
    /// Besides per-event checks, timestamps must never go backwards.
    pub fn validate_events(events: &[TimedEvent]) -> Vec<ValidationResult> {
        let mut failures = Vec::new();
        let mut previous: Option<DateTime<Utc>> = None;
        for (index, event) in events.iter().enumerate() {
            let mut result = event.validate().err();
            if result.is_none() {
                if let Some(previous) = previous.filter(|p| event.at < *p) {
                    result = Some(ValidationError::OutOfOrder {
                        at: event.at,
                        previous,
                    });
                }
            }
            previous = Some(previous.map_or(event.at, |p| p.max(event.at)));
            if let Some(error) = result {
                failures.push(ValidationResult {
                    index,
                    event_type: event.event.name(),
                    error,
                });
            }
        }
        failures
    }
}

/// A failed event and where it sits in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub event_type: &'static str,
    pub error: ValidationError,
}
