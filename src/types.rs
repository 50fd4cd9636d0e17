//! Shared data types
//!
//! The emitted session record and the values that travel with it to the
//! output sink.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gate::GateRejection;

/// Identity of the user a record is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
}

impl UserIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Summary record of one typing session.
///
/// Field names follow the document shape the persistence layer stores
/// (`users/{uid}/typing_session_data`). Times of day are local wall-clock
/// times; `duration` is in whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingData {
    pub date_created: DateTime<Utc>,
    pub total_pressure_by_times_counter: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub words_typed: u32,
    pub characters_typed: u32,
    pub duration: i64,

    // Typing speed
    #[serde(rename = "totalWPS")]
    pub total_wps: f64,
    #[serde(rename = "totalCPS")]
    pub total_cps: f64,

    // Word-to-word pauses
    #[serde(rename = "avgPauseWtWDuration")]
    pub avg_pause_wtw_duration: f64,
    #[serde(rename = "maxPauseWtWDuration")]
    pub max_pause_wtw_duration: f64,
    #[serde(rename = "pauseWtWListSize")]
    pub pause_wtw_list_size: u32,

    // Character-to-character pauses
    #[serde(rename = "avgPauseCtCDuration")]
    pub avg_pause_ctc_duration: f64,
    #[serde(rename = "maxPauseCtCDuration")]
    pub max_pause_ctc_duration: f64,
    #[serde(rename = "pauseCtCListSize")]
    pub pause_ctc_list_size: u32,

    // Inter-key intervals
    #[serde(rename = "meanIKI")]
    pub mean_iki: f64,
    #[serde(rename = "stdDevIKI")]
    pub std_dev_iki: f64,
    pub iki_list_size: u32,

    // Error patterns
    pub total_backspaces: u32,
    pub total_word_or_sentence_deletions: u32,
    pub total_backspace_burst_count: u32,
    pub max_backspace_burst_count: u32,
    pub total_characters_deleted: u32,
}

/// Result of ending a typing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SessionOutcome {
    /// The record passed the usability gate and was handed to the sink
    Emitted { session_id: Uuid },
    /// The session was too thin to keep
    Discarded {
        session_id: Uuid,
        rejection: GateRejection,
    },
}

impl SessionOutcome {
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionOutcome::Emitted { session_id } => *session_id,
            SessionOutcome::Discarded { session_id, .. } => *session_id,
        }
    }

    pub fn is_emitted(&self) -> bool {
        matches!(self, SessionOutcome::Emitted { .. })
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> UserTypingData {
    use chrono::TimeZone;

    UserTypingData {
        date_created: Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
        total_pressure_by_times_counter: 12,
        start_time: NaiveTime::from_hms_milli_opt(14, 0, 0, 125).unwrap(),
        end_time: NaiveTime::from_hms_milli_opt(14, 0, 10, 500).unwrap(),
        words_typed: 10,
        characters_typed: 50,
        duration: 10,
        total_wps: 1.0,
        total_cps: 5.0,
        avg_pause_wtw_duration: 4.0 / 3.0,
        max_pause_wtw_duration: 2.0,
        pause_wtw_list_size: 3,
        avg_pause_ctc_duration: 0.2,
        max_pause_ctc_duration: 0.9,
        pause_ctc_list_size: 49,
        mean_iki: 0.137,
        std_dev_iki: 0.0421,
        iki_list_size: 58,
        total_backspaces: 4,
        total_word_or_sentence_deletions: 1,
        total_backspace_burst_count: 1,
        max_backspace_burst_count: 3,
        total_characters_deleted: 2,
    }
}
