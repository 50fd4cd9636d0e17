//! Replay orchestration
//!
//! Drives the engine from a recorded keyboard.event.v1 stream instead of a
//! live keyboard. Each event moves a manual clock to its timestamp and is
//! then dispatched exactly as the keyboard host would.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, ManualClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::{EngineContext, InputSession};
use crate::schema::{EventAdapter, TimedEvent};
use crate::sink::{EmittedRecord, MemorySink};
use crate::types::{SessionOutcome, UserIdentity};

/// Everything a replay produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Outcome of every typing session, in the order they ended
    pub outcomes: Vec<SessionOutcome>,
    /// Records that passed the gate and reached the sink
    pub records: Vec<EmittedRecord>,
    pub events_processed: usize,
    /// Events that failed validation or were rejected by the engine
    pub rejected_events: usize,
}

impl ReplayReport {
    pub fn emitted_count(&self) -> usize {
        self.records.len()
    }

    pub fn discarded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_emitted()).count()
    }
}

/// Replay a decoded event stream (stateless, one-shot).
///
/// A session still open after the last event is ended as if the keyboard
/// closed.
pub fn replay_events(
    events: &[TimedEvent],
    identity: UserIdentity,
    config: EngineConfig,
) -> Result<ReplayReport, EngineError> {
    let mut replayer = SessionReplayer::new(identity, config)?;
    replayer.feed_all(events);
    Ok(replayer.finish())
}

/// Replay an NDJSON or JSON-array event stream and return the report as JSON.
///
/// # Example
/// ```ignore
/// let report_json = replay_to_json(ndjson, "user-123".to_string())?;
/// ```
pub fn replay_to_json(events_input: String, uid: String) -> Result<String, EngineError> {
    let events = EventAdapter::parse(&events_input)?;
    let report = replay_events(&events, UserIdentity::new(uid), EngineConfig::default())?;
    Ok(serde_json::to_string(&report)?)
}

/// Stateful replayer for feeding events incrementally.
///
/// Holds one input session for its whole lifetime, like a keyboard that
/// stays open across several text fields. The input session opens at the
/// first event's timestamp.
pub struct SessionReplayer {
    identity: UserIdentity,
    config: EngineConfig,
    clock: ManualClock,
    sink: MemorySink,
    input: Option<InputSession>,
    records: Vec<EmittedRecord>,
    events_processed: usize,
    rejected_events: usize,
}

impl SessionReplayer {
    pub fn new(identity: UserIdentity, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            identity,
            config,
            clock: ManualClock::new(Utc::now()),
            sink: MemorySink::new(),
            input: None,
            records: Vec::new(),
            events_processed: 0,
            rejected_events: 0,
        })
    }

    /// Feed one event.
    ///
    /// Invalid or out-of-order events are counted and skipped; engine
    /// rejections are counted and the replay carries on.
    pub fn feed(&mut self, event: &TimedEvent) {
        self.events_processed += 1;

        if let Err(e) = event.validate() {
            warn!(index = self.events_processed - 1, error = %e, "skipping invalid event");
            self.rejected_events += 1;
            return;
        }

        if self.input.is_none() {
            self.clock.set(event.at);
            let context = EngineContext::new(self.identity.clone(), Arc::new(self.sink.clone()))
                .with_clock(self.clock.clone())
                .with_config(self.config);
            self.input = Some(InputSession::new(context));
        } else if event.at < self.clock.now() {
            warn!(at = %event.at, "skipping out-of-order event");
            self.rejected_events += 1;
            return;
        }
        self.clock.set(event.at);

        let input = match self.input.as_mut() {
            Some(input) => input,
            None => return,
        };
        debug!(event = event.event.name(), at = %event.at, "replaying event");
        if input.dispatch(&event.event).is_err() {
            self.rejected_events += 1;
        }
        self.records.extend(self.sink.drain());
    }

    pub fn feed_all(&mut self, events: &[TimedEvent]) {
        for event in events {
            self.feed(event);
        }
    }

    /// Records emitted since the last call
    pub fn take_records(&mut self) -> Vec<EmittedRecord> {
        std::mem::take(&mut self.records)
    }

    /// Close the input session and collect the report
    pub fn finish(mut self) -> ReplayReport {
        let outcomes = match self.input.take() {
            Some(input) => input.close(),
            None => Vec::new(),
        };
        self.records.extend(self.sink.drain());

        let report = ReplayReport {
            outcomes,
            records: self.records,
            events_processed: self.events_processed,
            rejected_events: self.rejected_events,
        };
        info!(
            events = report.events_processed,
            rejected = report.rejected_events,
            emitted = report.emitted_count(),
            discarded = report.discarded_count(),
            "replay finished"
        );
        report
    }
}
