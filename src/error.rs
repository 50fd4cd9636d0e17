//! Error types for the keystroke session engine

use thiserror::Error;

use crate::metrics::MetricKind;

/// Errors raised by the session engine.
///
/// Everything except the parse/config variants is a protocol misuse by the
/// event source: the offending call is rejected and the session stays usable.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} timer already active in slot {slot}")]
    TimerSlotOccupied { kind: MetricKind, slot: usize },

    #[error("no active {kind} timer in slot {slot}")]
    TimerNotOpen { kind: MetricKind, slot: usize },

    #[error("invalid PauseCtC slot index: {0}")]
    InvalidSlot(usize),

    #[error("typing session {0} has already ended")]
    SessionEnded(uuid::Uuid),

    #[error("no active typing session")]
    NoActiveSession,

    #[error("invalid backspace burst length: {0} (a burst needs at least 2 presses)")]
    InvalidBurstLength(u32),

    #[error("invalid pressure value: {0} (must not be negative)")]
    InvalidPressure(i64),

    #[error("pressure counter overflow")]
    PressureOverflow,

    #[error("Failed to parse event stream: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<figment::Error> for EngineError {
    fn from(e: figment::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}
