//! Typing session
//!
//! One analytics unit, bounded by focus-in and focus-out of a text field.
//! The session moves `Created → Active → Ended`; once ended, every mutation is
//! rejected with [`EngineError::SessionEnded`].

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{summarize_iki, summarize_pause_ctc, summarize_pause_wtw};
use crate::config::OverlapPolicy;
use crate::counters::CounterBank;
use crate::error::EngineError;
use crate::gate::{GateRejection, UsabilityGate};
use crate::metrics::{IntervalTimer, MetricKind};
use crate::registry::{CtcSlot, TimerRegistry};
use crate::types::{SessionOutcome, UserTypingData};

/// Lifecycle state of a typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Ended,
}

/// Record built at the end of a session together with the gate verdict
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub record: UserTypingData,
    pub verdict: Result<(), GateRejection>,
}

impl SessionReport {
    pub fn outcome(&self) -> SessionOutcome {
        match self.verdict {
            Ok(()) => SessionOutcome::Emitted {
                session_id: self.session_id,
            },
            Err(rejection) => SessionOutcome::Discarded {
                session_id: self.session_id,
                rejection,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypingSession {
    id: Uuid,
    date_created: DateTime<Utc>,
    state: SessionState,
    span: IntervalTimer,
    counters: CounterBank,
    timers: TimerRegistry,
}

impl TypingSession {
    pub fn new(date_created: DateTime<Utc>, policy: OverlapPolicy) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, "typing session created");
        Self {
            id,
            date_created,
            state: SessionState::Created,
            span: IntervalTimer::new(),
            counters: CounterBank::default(),
            timers: TimerRegistry::new(policy),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    pub fn counters(&self) -> &CounterBank {
        &self.counters
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Move `Created → Active`, stamping the start time. Starting an active
    /// session is a no-op.
    pub fn start(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        match self.state {
            SessionState::Created => {
                self.span.start(now);
                self.state = SessionState::Active;
                info!(session_id = %self.id, start = %now, "typing session started");
                Ok(())
            }
            SessionState::Active => Ok(()),
            SessionState::Ended => Err(EngineError::SessionEnded(self.id)),
        }
    }

    /// Gate for every mutation: activates a fresh session, refuses an ended one.
    fn touch(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.start(now)
    }

    // ------------------------------------------------------------------
    // Timer registry operations
    // ------------------------------------------------------------------

    pub fn open_iki(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.open_iki(now)
    }

    pub fn close_iki(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.close_iki(now)
    }

    pub fn open_pause_wtw(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.open_pause_wtw(now)
    }

    pub fn close_pause_wtw(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.close_pause_wtw(now)
    }

    pub fn open_pause_ctc(&mut self, slot: CtcSlot, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.open_pause_ctc(slot, now)
    }

    pub fn close_pause_ctc(&mut self, slot: CtcSlot, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.close_pause_ctc(slot, now)
    }

    // ------------------------------------------------------------------
    // Keyboard events
    // ------------------------------------------------------------------

    /// Key pressed: ends the pending inter-key interval, if any
    pub fn key_down(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        if self.timers.iki_pending() {
            self.timers.close_iki(now)?;
        }
        Ok(())
    }

    /// Key released: starts the next inter-key interval
    pub fn key_up(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.timers.open_iki(now)
    }

    /// A character was committed.
    ///
    /// Ends a pending word pause and the deletion pause, then rolls the
    /// character pause over to start from this keystroke.
    pub fn character_typed(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.character_typed();

        if self.timers.pause_wtw_pending() {
            self.timers.close_pause_wtw(now)?;
        }
        if self.timers.pause_ctc_pending(CtcSlot::Secondary) {
            self.timers.close_pause_ctc(CtcSlot::Secondary, now)?;
        }
        if self.timers.pause_ctc_pending(CtcSlot::Primary) {
            self.timers.close_pause_ctc(CtcSlot::Primary, now)?;
        }
        self.timers.open_pause_ctc(CtcSlot::Primary, now)
    }

    /// A word was completed; the word pause runs until the next character
    pub fn word_boundary(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.word_typed();
        if !self.timers.pause_wtw_pending() {
            self.timers.open_pause_wtw(now)?;
        }
        Ok(())
    }

    /// Backspace pressed; opens the deletion pause unless one is running
    pub fn backspace(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.backspace_pressed();
        if !self.timers.pause_ctc_pending(CtcSlot::Secondary) {
            self.timers.open_pause_ctc(CtcSlot::Secondary, now)?;
        }
        Ok(())
    }

    pub fn backspace_burst(&mut self, length: u32, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        if length < 2 {
            return Err(EngineError::InvalidBurstLength(length));
        }
        self.counters.backspace_burst(length);
        Ok(())
    }

    pub fn word_or_sentence_deleted(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.word_or_sentence_deleted();
        Ok(())
    }

    pub fn character_deleted(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.character_deleted();
        Ok(())
    }

    pub fn pressure_added(&mut self, amount: i64, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.add_pressure(amount)
    }

    pub fn pressure_removed(&mut self, amount: i64, now: NaiveTime) -> Result<(), EngineError> {
        self.touch(now)?;
        self.counters.remove_pressure(amount)
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Whole seconds between start and end; 0 until both are stamped
    pub fn duration_secs(&self) -> i64 {
        self.span.duration().map(|d| d.trunc() as i64).unwrap_or(0)
    }

    /// Words per second over the whole session
    pub fn words_per_second(&self) -> f64 {
        per_second(self.counters.words_typed, self.duration_secs())
    }

    /// Characters per second over the whole session
    pub fn characters_per_second(&self) -> f64 {
        per_second(self.counters.characters_typed, self.duration_secs())
    }

    /// End the session and build its record.
    ///
    /// Runs once: a second call fails with [`EngineError::SessionEnded`].
    /// Timers still pending at this point are dropped.
    pub fn finish(
        &mut self,
        now: NaiveTime,
        gate: &UsabilityGate,
    ) -> Result<SessionReport, EngineError> {
        if self.state == SessionState::Ended {
            return Err(EngineError::SessionEnded(self.id));
        }
        if self.state == SessionState::Created {
            self.span.start(now);
        }
        self.span.end(now);
        self.state = SessionState::Ended;

        let record = self.build_record(now);
        let verdict = gate.check(
            record.words_typed,
            record.characters_typed,
            record.duration,
        );

        info!(
            session_id = %self.id,
            start = %record.start_time,
            end = %record.end_time,
            duration_secs = record.duration,
            words = record.words_typed,
            characters = record.characters_typed,
            wps = record.total_wps,
            cps = record.total_cps,
            avg_pause_wtw = record.avg_pause_wtw_duration,
            max_pause_wtw = record.max_pause_wtw_duration,
            pause_wtw_count = record.pause_wtw_list_size,
            avg_pause_ctc = record.avg_pause_ctc_duration,
            max_pause_ctc = record.max_pause_ctc_duration,
            pause_ctc_count = record.pause_ctc_list_size,
            mean_iki = record.mean_iki,
            std_dev_iki = record.std_dev_iki,
            iki_count = record.iki_list_size,
            backspaces = record.total_backspaces,
            bursts = record.total_backspace_burst_count,
            characters_deleted = record.total_characters_deleted,
            "typing session ended"
        );

        Ok(SessionReport {
            session_id: self.id,
            record,
            verdict,
        })
    }

    fn build_record(&self, now: NaiveTime) -> UserTypingData {
        let pause_wtw = summarize_pause_wtw(&self.timers.samples(MetricKind::PauseWtW));
        let pause_ctc = summarize_pause_ctc(&self.timers.samples(MetricKind::PauseCtC));
        let iki = summarize_iki(&self.timers.samples(MetricKind::Iki));
        let counters = &self.counters;

        UserTypingData {
            date_created: self.date_created,
            total_pressure_by_times_counter: counters.pressure,
            start_time: self.span.start_time().unwrap_or(now),
            end_time: self.span.end_time().unwrap_or(now),
            words_typed: counters.words_typed,
            characters_typed: counters.characters_typed,
            duration: self.duration_secs(),
            total_wps: self.words_per_second(),
            total_cps: self.characters_per_second(),
            avg_pause_wtw_duration: pause_wtw.average,
            max_pause_wtw_duration: pause_wtw.max,
            pause_wtw_list_size: pause_wtw.count,
            avg_pause_ctc_duration: pause_ctc.average,
            max_pause_ctc_duration: pause_ctc.max,
            pause_ctc_list_size: pause_ctc.count,
            mean_iki: iki.mean,
            std_dev_iki: iki.std_dev,
            iki_list_size: iki.count,
            total_backspaces: counters.backspaces,
            total_word_or_sentence_deletions: counters.word_or_sentence_deletions,
            total_backspace_burst_count: counters.backspace_bursts,
            max_backspace_burst_count: counters.max_backspace_burst,
            total_characters_deleted: counters.characters_deleted,
        }
    }
}

fn per_second(count: u32, duration_secs: i64) -> f64 {
    if duration_secs <= 0 {
        return 0.0;
    }
    count as f64 / duration_secs as f64
}
