//! Active timer registry
//!
//! Holds the currently open timers of a typing session and the completed
//! timers of each kind. IKI and PauseWtW get a single slot; PauseCtC gets a
//! fixed pair of slots because a character pause can overlap a pending
//! deletion pause.

use chrono::NaiveTime;
use tracing::{debug, warn};

use crate::config::OverlapPolicy;
use crate::error::EngineError;
use crate::metrics::{Metric, MetricKind};

/// Slot index in the PauseCtC pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtcSlot {
    /// Pause between consecutive characters
    Primary,
    /// Pause that started on a deletion and ends when typing resumes
    Secondary,
}

impl CtcSlot {
    pub fn index(self) -> usize {
        match self {
            CtcSlot::Primary => 0,
            CtcSlot::Secondary => 1,
        }
    }
}

impl TryFrom<usize> for CtcSlot {
    type Error = EngineError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(CtcSlot::Primary),
            1 => Ok(CtcSlot::Secondary),
            other => Err(EngineError::InvalidSlot(other)),
        }
    }
}

/// At most one pending timer of a kind
#[derive(Debug, Clone)]
pub struct ExclusiveSlot {
    kind: MetricKind,
    active: Option<Metric>,
}

impl ExclusiveSlot {
    pub fn new(kind: MetricKind) -> Self {
        Self { kind, active: None }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn open(&mut self, now: NaiveTime, policy: OverlapPolicy) -> Result<(), EngineError> {
        open_slot(&mut self.active, self.kind, 0, now, policy)
    }

    pub fn close(&mut self, now: NaiveTime) -> Result<Metric, EngineError> {
        close_slot(&mut self.active, self.kind, 0, now)
    }
}

/// Two independent pending PauseCtC timers
#[derive(Debug, Clone)]
pub struct PairedSlots {
    active: [Option<Metric>; 2],
}

impl Default for PairedSlots {
    fn default() -> Self {
        Self {
            active: [None, None],
        }
    }
}

impl PairedSlots {
    pub fn is_open(&self, slot: CtcSlot) -> bool {
        self.active[slot.index()].is_some()
    }

    pub fn open(
        &mut self,
        slot: CtcSlot,
        now: NaiveTime,
        policy: OverlapPolicy,
    ) -> Result<(), EngineError> {
        let index = slot.index();
        open_slot(&mut self.active[index], MetricKind::PauseCtC, index, now, policy)
    }

    pub fn close(&mut self, slot: CtcSlot, now: NaiveTime) -> Result<Metric, EngineError> {
        let index = slot.index();
        close_slot(&mut self.active[index], MetricKind::PauseCtC, index, now)
    }
}

fn open_slot(
    active: &mut Option<Metric>,
    kind: MetricKind,
    slot: usize,
    now: NaiveTime,
    policy: OverlapPolicy,
) -> Result<(), EngineError> {
    if active.is_some() {
        match policy {
            OverlapPolicy::Reject => {
                return Err(EngineError::TimerSlotOccupied { kind, slot });
            }
            OverlapPolicy::Restart => {
                warn!(%kind, slot, "discarding pending timer on restart");
            }
        }
    }
    *active = Some(Metric::started(kind, now));
    debug!(%kind, slot, "timer opened");
    Ok(())
}

fn close_slot(
    active: &mut Option<Metric>,
    kind: MetricKind,
    slot: usize,
    now: NaiveTime,
) -> Result<Metric, EngineError> {
    let mut metric = active
        .take()
        .ok_or(EngineError::TimerNotOpen { kind, slot })?;
    metric.end(now);
    debug!(%kind, slot, duration = ?metric.duration(), "timer closed");
    Ok(metric)
}

/// All timers of one typing session: pending slots plus completed lists
#[derive(Debug, Clone)]
pub struct TimerRegistry {
    policy: OverlapPolicy,
    iki: ExclusiveSlot,
    pause_wtw: ExclusiveSlot,
    pause_ctc: PairedSlots,
    completed_iki: Vec<Metric>,
    completed_pause_wtw: Vec<Metric>,
    completed_pause_ctc: Vec<Metric>,
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

impl TimerRegistry {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            iki: ExclusiveSlot::new(MetricKind::Iki),
            pause_wtw: ExclusiveSlot::new(MetricKind::PauseWtW),
            pause_ctc: PairedSlots::default(),
            completed_iki: Vec::new(),
            completed_pause_wtw: Vec::new(),
            completed_pause_ctc: Vec::new(),
        }
    }

    pub fn open_iki(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.iki.open(now, self.policy)
    }

    pub fn close_iki(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        let metric = self.iki.close(now)?;
        self.completed_iki.push(metric);
        Ok(())
    }

    pub fn iki_pending(&self) -> bool {
        self.iki.is_open()
    }

    pub fn open_pause_wtw(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        self.pause_wtw.open(now, self.policy)
    }

    pub fn close_pause_wtw(&mut self, now: NaiveTime) -> Result<(), EngineError> {
        let metric = self.pause_wtw.close(now)?;
        self.completed_pause_wtw.push(metric);
        Ok(())
    }

    pub fn pause_wtw_pending(&self) -> bool {
        self.pause_wtw.is_open()
    }

    pub fn open_pause_ctc(&mut self, slot: CtcSlot, now: NaiveTime) -> Result<(), EngineError> {
        self.pause_ctc.open(slot, now, self.policy)
    }

    pub fn close_pause_ctc(&mut self, slot: CtcSlot, now: NaiveTime) -> Result<(), EngineError> {
        let metric = self.pause_ctc.close(slot, now)?;
        self.completed_pause_ctc.push(metric);
        Ok(())
    }

    pub fn pause_ctc_pending(&self, slot: CtcSlot) -> bool {
        self.pause_ctc.is_open(slot)
    }

    /// Append an externally measured timer to its kind's completed list
    pub fn record_completed(&mut self, metric: Metric) {
        match metric.kind() {
            MetricKind::Iki => self.completed_iki.push(metric),
            MetricKind::PauseWtW => self.completed_pause_wtw.push(metric),
            MetricKind::PauseCtC => self.completed_pause_ctc.push(metric),
        }
    }

    pub fn completed(&self, kind: MetricKind) -> &[Metric] {
        match kind {
            MetricKind::Iki => &self.completed_iki,
            MetricKind::PauseWtW => &self.completed_pause_wtw,
            MetricKind::PauseCtC => &self.completed_pause_ctc,
        }
    }

    /// Aggregation samples of a kind, in completion order
    pub fn samples(&self, kind: MetricKind) -> Vec<f64> {
        self.completed(kind).iter().map(Metric::sample).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_open_close_moves_to_completed() {
        let mut registry = TimerRegistry::default();
        registry.open_iki(t(10, 0, 0)).unwrap();
        assert!(registry.iki_pending());

        registry.close_iki(t(10, 0, 1)).unwrap();
        assert!(!registry.iki_pending());
        assert_eq!(registry.samples(MetricKind::Iki), vec![1.0]);
    }

    #[test]
    fn test_reject_policy_keeps_pending_timer() {
        let mut registry = TimerRegistry::new(OverlapPolicy::Reject);
        registry.open_pause_wtw(t(10, 0, 0)).unwrap();

        let err = registry.open_pause_wtw(t(10, 0, 5)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TimerSlotOccupied {
                kind: MetricKind::PauseWtW,
                slot: 0
            }
        ));

        registry.close_pause_wtw(t(10, 0, 6)).unwrap();
        assert_eq!(registry.samples(MetricKind::PauseWtW), vec![6.0]);
    }

    #[test]
    fn test_restart_policy_replaces_pending_timer() {
        let mut registry = TimerRegistry::new(OverlapPolicy::Restart);
        registry.open_iki(t(10, 0, 0)).unwrap();
        registry.open_iki(t(10, 0, 5)).unwrap();
        registry.close_iki(t(10, 0, 6)).unwrap();

        assert_eq!(registry.samples(MetricKind::Iki), vec![1.0]);
    }

    #[test]
    fn test_close_without_open_is_an_error() {
        let mut registry = TimerRegistry::default();
        assert!(matches!(
            registry.close_iki(t(10, 0, 0)),
            Err(EngineError::TimerNotOpen {
                kind: MetricKind::Iki,
                ..
            })
        ));
        assert!(matches!(
            registry.close_pause_ctc(CtcSlot::Secondary, t(10, 0, 0)),
            Err(EngineError::TimerNotOpen { slot: 1, .. })
        ));
        assert!(registry.completed(MetricKind::Iki).is_empty());
    }

    #[test]
    fn test_ctc_slots_are_independent() {
        let mut registry = TimerRegistry::default();
        registry.open_pause_ctc(CtcSlot::Primary, t(10, 0, 0)).unwrap();
        registry.open_pause_ctc(CtcSlot::Secondary, t(10, 0, 1)).unwrap();

        assert!(registry.open_pause_ctc(CtcSlot::Primary, t(10, 0, 2)).is_err());

        registry.close_pause_ctc(CtcSlot::Secondary, t(10, 0, 3)).unwrap();
        assert!(registry.pause_ctc_pending(CtcSlot::Primary));
        assert!(!registry.pause_ctc_pending(CtcSlot::Secondary));

        registry.close_pause_ctc(CtcSlot::Primary, t(10, 0, 4)).unwrap();
        assert_eq!(registry.samples(MetricKind::PauseCtC), vec![2.0, 4.0]);
    }

    #[test]
    fn test_slot_from_index() {
        assert_eq!(CtcSlot::try_from(0).unwrap(), CtcSlot::Primary);
        assert_eq!(CtcSlot::try_from(1).unwrap(), CtcSlot::Secondary);
        assert!(matches!(
            CtcSlot::try_from(2),
            Err(EngineError::InvalidSlot(2))
        ));
    }

    #[test]
    fn test_record_completed_keeps_unavailable_timers() {
        let mut registry = TimerRegistry::default();
        registry.record_completed(Metric::new(MetricKind::PauseCtC));
        registry.record_completed(Metric::new(MetricKind::PauseWtW));

        assert_eq!(registry.samples(MetricKind::PauseCtC), vec![-1.0]);
        assert_eq!(registry.samples(MetricKind::PauseWtW), vec![0.0]);
    }
}
