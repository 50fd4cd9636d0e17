//! Input session: the keyboard-facing event source boundary
//!
//! An [`InputSession`] spans keyboard open to keyboard close and owns at most
//! one active [`TypingSession`]. Everything the engine needs from the outside
//! world (clock, sink, user identity, configuration) arrives through an
//! explicit [`EngineContext`].
//!
//! Handlers return `Err` on protocol misuse and log it; the session stays
//! usable and keeps accepting events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gate::UsabilityGate;
use crate::registry::CtcSlot;
use crate::schema::KeyboardEvent;
use crate::session::TypingSession;
use crate::sink::OutputSink;
use crate::types::{SessionOutcome, UserIdentity};

/// Collaborators the engine is given instead of reaching for globals
pub struct EngineContext {
    pub identity: UserIdentity,
    pub sink: Arc<dyn OutputSink>,
    pub clock: Box<dyn Clock>,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Context with the system clock and default configuration
    pub fn new(identity: UserIdentity, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            identity,
            sink,
            clock: Box::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

pub struct InputSession {
    context: EngineContext,
    gate: UsabilityGate,
    started_at: DateTime<Utc>,
    active: Option<TypingSession>,
    outcomes: Vec<SessionOutcome>,
}

impl InputSession {
    pub fn new(context: EngineContext) -> Self {
        let started_at = context.clock.now();
        let gate = UsabilityGate::new(context.config.gate);
        info!(uid = %context.identity.uid, %started_at, "input session opened");
        Self {
            context,
            gate,
            started_at,
            active: None,
            outcomes: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.context.identity
    }

    pub fn active_session(&self) -> Option<&TypingSession> {
        self.active.as_ref()
    }

    /// Outcomes of typing sessions ended since the last drain, oldest first
    pub fn outcomes(&self) -> &[SessionOutcome] {
        &self.outcomes
    }

    /// Take the buffered outcomes. Long-lived hosts drain these periodically.
    pub fn take_outcomes(&mut self) -> Vec<SessionOutcome> {
        std::mem::take(&mut self.outcomes)
    }

    /// Text field focused: start a new typing session.
    ///
    /// A focus-in while a session is still active ends that session first.
    pub fn on_focus_in(&mut self) -> Result<(), EngineError> {
        if self.active.is_some() {
            warn!("focus-in with an active typing session, ending it first");
            self.end_active()?;
        }
        let mut session = TypingSession::new(
            self.context.clock.now(),
            self.context.config.timers.overlap_policy,
        );
        session.start(self.context.clock.time_of_day())?;
        self.active = Some(session);
        Ok(())
    }

    /// Text field lost focus: end the active typing session
    pub fn on_focus_out(&mut self) -> Result<SessionOutcome, EngineError> {
        self.end_active()
    }

    pub fn on_word_boundary(&mut self) -> Result<(), EngineError> {
        self.with_active("word_boundary", |s, now| s.word_boundary(now))
    }

    pub fn on_character_typed(&mut self) -> Result<(), EngineError> {
        self.with_active("character_typed", |s, now| s.character_typed(now))
    }

    pub fn on_key_down(&mut self) -> Result<(), EngineError> {
        self.with_active("key_down", |s, now| s.key_down(now))
    }

    pub fn on_key_up(&mut self) -> Result<(), EngineError> {
        self.with_active("key_up", |s, now| s.key_up(now))
    }

    pub fn on_backspace(&mut self) -> Result<(), EngineError> {
        self.with_active("backspace", |s, now| s.backspace(now))
    }

    pub fn on_burst_detected(&mut self, length: u32) -> Result<(), EngineError> {
        self.with_active("burst_detected", |s, now| s.backspace_burst(length, now))
    }

    pub fn on_pressure_sample(&mut self, value: i64) -> Result<(), EngineError> {
        self.with_active("pressure_sample", |s, now| s.pressure_added(value, now))
    }

    pub fn on_pressure_removed(&mut self, value: i64) -> Result<(), EngineError> {
        self.with_active("pressure_removed", |s, now| s.pressure_removed(value, now))
    }

    pub fn on_word_or_sentence_deleted(&mut self) -> Result<(), EngineError> {
        self.with_active("word_or_sentence_deleted", |s, now| s.word_or_sentence_deleted(now))
    }

    pub fn on_character_deleted(&mut self) -> Result<(), EngineError> {
        self.with_active("character_deleted", |s, now| s.character_deleted(now))
    }

    /// Direct timer control for event sources that manage PauseCtC slots themselves
    pub fn open_pause_ctc(&mut self, slot: usize) -> Result<(), EngineError> {
        let slot = CtcSlot::try_from(slot).map_err(|e| rejected("open_pause_ctc", e))?;
        self.with_active("open_pause_ctc", |s, now| s.open_pause_ctc(slot, now))
    }

    pub fn close_pause_ctc(&mut self, slot: usize) -> Result<(), EngineError> {
        let slot = CtcSlot::try_from(slot).map_err(|e| rejected("close_pause_ctc", e))?;
        self.with_active("close_pause_ctc", |s, now| s.close_pause_ctc(slot, now))
    }

    /// Route a decoded event to its handler.
    ///
    /// Returns the session outcome for focus-out events.
    pub fn dispatch(&mut self, event: &KeyboardEvent) -> Result<Option<SessionOutcome>, EngineError> {
        match *event {
            KeyboardEvent::FocusIn => self.on_focus_in().map(|()| None),
            KeyboardEvent::FocusOut => self.on_focus_out().map(Some),
            KeyboardEvent::WordBoundary => self.on_word_boundary().map(|()| None),
            KeyboardEvent::CharacterTyped => self.on_character_typed().map(|()| None),
            KeyboardEvent::KeyDown => self.on_key_down().map(|()| None),
            KeyboardEvent::KeyUp => self.on_key_up().map(|()| None),
            KeyboardEvent::Backspace => self.on_backspace().map(|()| None),
            KeyboardEvent::BurstDetected { length } => {
                self.on_burst_detected(length).map(|()| None)
            }
            KeyboardEvent::PressureSample { value } => {
                self.on_pressure_sample(value).map(|()| None)
            }
            KeyboardEvent::PressureRemoved { value } => {
                self.on_pressure_removed(value).map(|()| None)
            }
            KeyboardEvent::WordOrSentenceDeleted => {
                self.on_word_or_sentence_deleted().map(|()| None)
            }
            KeyboardEvent::CharacterDeleted => self.on_character_deleted().map(|()| None),
        }
    }

    /// Keyboard closing: end the active typing session if there is one
    pub fn close(mut self) -> Vec<SessionOutcome> {
        if self.active.is_some() {
            if let Err(e) = self.end_active() {
                warn!(error = %e, "failed to end typing session on close");
            }
        }
        info!(uid = %self.context.identity.uid, sessions = self.outcomes.len(), "input session closed");
        self.outcomes
    }

    fn with_active<F>(&mut self, operation: &'static str, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut TypingSession, chrono::NaiveTime) -> Result<(), EngineError>,
    {
        let now = self.context.clock.time_of_day();
        let session = self
            .active
            .as_mut()
            .ok_or_else(|| rejected(operation, EngineError::NoActiveSession))?;
        f(session, now).map_err(|e| rejected(operation, e))
    }

    fn end_active(&mut self) -> Result<SessionOutcome, EngineError> {
        let mut session = self
            .active
            .take()
            .ok_or_else(|| rejected("focus_out", EngineError::NoActiveSession))?;
        let report = session
            .finish(self.context.clock.time_of_day(), &self.gate)
            .map_err(|e| rejected("focus_out", e))?;
        let outcome = report.outcome();

        match report.verdict {
            Ok(()) => {
                self.context.sink.emit(&self.context.identity, report.record);
            }
            Err(rejection) => {
                info!(session_id = %report.session_id, %rejection, "typing session discarded");
            }
        }

        self.outcomes.push(outcome.clone());
        Ok(outcome)
    }
}

fn rejected(operation: &'static str, error: EngineError) -> EngineError {
    warn!(operation, error = %error, "keyboard event rejected");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sink::MemorySink;
    use chrono::TimeZone;

    fn setup() -> (InputSession, ManualClock, MemorySink) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let sink = MemorySink::new();
        let context = EngineContext::new(UserIdentity::new("user-1"), Arc::new(sink.clone()))
            .with_clock(clock.clone());
        (InputSession::new(context), clock, sink)
    }

    fn type_word(input: &mut InputSession, clock: &ManualClock, letters: usize) {
        for _ in 0..letters {
            input.on_key_down().unwrap();
            input.on_character_typed().unwrap();
            clock.advance_secs(0.05);
            input.on_key_up().unwrap();
            clock.advance_secs(0.1);
        }
        input.on_word_boundary().unwrap();
        clock.advance_secs(0.3);
    }

    #[test]
    fn test_session_emitted_to_sink() {
        let (mut input, clock, sink) = setup();
        input.on_focus_in().unwrap();
        for _ in 0..5 {
            type_word(&mut input, &clock, 5);
        }
        clock.advance_secs(1.0);

        let outcome = input.on_focus_out().unwrap();
        assert!(outcome.is_emitted());
        assert!(input.active_session().is_none());

        let records = sink.drain();
        assert_eq!(records.len(), 1);
        let record = &records[0].record;
        assert_eq!(records[0].user.uid, "user-1");
        assert_eq!(record.words_typed, 5);
        assert_eq!(record.characters_typed, 25);
        assert_eq!(record.pause_wtw_list_size, 4);
        // 20 in-word intervals of 0.1 s, 4 across word gaps of 0.4 s
        assert_eq!(record.iki_list_size, 24);
        assert!((record.mean_iki - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_thin_session_discarded() {
        let (mut input, clock, sink) = setup();
        input.on_focus_in().unwrap();
        type_word(&mut input, &clock, 3);
        clock.advance_secs(5.0);

        let outcome = input.on_focus_out().unwrap();
        assert!(!outcome.is_emitted());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_events_without_session_rejected() {
        let (mut input, _clock, _sink) = setup();
        assert!(matches!(
            input.on_character_typed(),
            Err(EngineError::NoActiveSession)
        ));
        assert!(matches!(
            input.on_focus_out(),
            Err(EngineError::NoActiveSession)
        ));
    }

    #[test]
    fn test_misuse_does_not_stop_processing() {
        let (mut input, _clock, _sink) = setup();
        input.on_focus_in().unwrap();
        input.on_key_up().unwrap();
        assert!(input.dispatch(&KeyboardEvent::KeyUp).is_err());

        input.dispatch(&KeyboardEvent::CharacterTyped).unwrap();
        let session = input.active_session().unwrap();
        assert_eq!(session.counters().characters_typed, 1);
    }

    #[test]
    fn test_direct_handler_misuse_is_logged() {
        use std::io;
        use std::sync::Mutex;

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let (mut input, _clock, _sink) = setup();
            assert!(input.on_key_down().is_err());
            input.on_focus_in().unwrap();
            input.on_key_up().unwrap();
            assert!(input.on_key_up().is_err());
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("keyboard event rejected").count(), 2);
        assert!(logs.contains("key_down"));
        assert!(logs.contains("key_up"));
    }

    #[test]
    fn test_take_outcomes_drains_buffer() {
        let (mut input, _clock, _sink) = setup();
        input.on_focus_in().unwrap();
        input.on_focus_out().unwrap();
        input.on_focus_in().unwrap();
        input.on_focus_out().unwrap();

        assert_eq!(input.take_outcomes().len(), 2);
        assert!(input.outcomes().is_empty());
        assert!(input.close().is_empty());
    }

    #[test]
    fn test_refocus_ends_previous_session() {
        let (mut input, _clock, _sink) = setup();
        input.on_focus_in().unwrap();
        let first = input.active_session().unwrap().id();
        input.on_focus_in().unwrap();

        assert_eq!(input.outcomes().len(), 1);
        assert_eq!(input.outcomes()[0].session_id(), first);
        assert_ne!(input.active_session().unwrap().id(), first);
    }

    #[test]
    fn test_invalid_slot_rejected() {
        let (mut input, _clock, _sink) = setup();
        input.on_focus_in().unwrap();
        assert!(matches!(
            input.open_pause_ctc(2),
            Err(EngineError::InvalidSlot(2))
        ));
        input.open_pause_ctc(1).unwrap();
        input.close_pause_ctc(1).unwrap();
    }

    #[test]
    fn test_close_flushes_active_session() {
        let (mut input, clock, sink) = setup();
        input.on_focus_in().unwrap();
        for _ in 0..4 {
            type_word(&mut input, &clock, 6);
        }
        clock.advance_secs(2.0);

        let outcomes = input.close();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(sink.len(), 1);
    }
}
