//! Keystroke timing metrics
//!
//! Three metric kinds are measured with the same [`IntervalTimer`]:
//!
//! - **IKI**: inter-key interval, from a key release to the next key press
//! - **PauseWtW**: pause between finishing one word and starting the next
//! - **PauseCtC**: pause between two character-level keystrokes
//!
//! When a timer cannot produce a duration, each kind feeds its own legacy
//! sentinel into aggregation (−1 for IKI and PauseCtC, 0 for PauseWtW).

pub mod timer;

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub use timer::IntervalTimer;

/// Sentinel for an unavailable IKI or PauseCtC sample
pub const UNAVAILABLE: f64 = -1.0;

/// Sentinel for an unavailable PauseWtW sample ("no weight")
pub const PAUSE_WTW_UNAVAILABLE: f64 = 0.0;

/// Metric kinds tracked by a typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Iki,
    #[serde(rename = "pause_wtw")]
    PauseWtW,
    #[serde(rename = "pause_ctc")]
    PauseCtC,
}

impl MetricKind {
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Iki => "IKI",
            MetricKind::PauseWtW => "PAUSE_DURATION_WtW",
            MetricKind::PauseCtC => "PAUSE_DURATION_CtC",
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            MetricKind::Iki => "Keystroke Timing",
            MetricKind::PauseWtW | MetricKind::PauseCtC => "Keystroke Dynamics",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::Iki => {
                "Inter-Key Interval (IKI): the time between the release of one key and the press of the next key."
            }
            MetricKind::PauseWtW => "The duration of the pause between two words.",
            MetricKind::PauseCtC => "The duration of the pause between two characters.",
        }
    }

    pub fn importance(self) -> u8 {
        3
    }

    /// Sample value recorded when the timer has no duration
    pub fn unavailable_sample(self) -> f64 {
        match self {
            MetricKind::Iki | MetricKind::PauseCtC => UNAVAILABLE,
            MetricKind::PauseWtW => PAUSE_WTW_UNAVAILABLE,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Iki => write!(f, "IKI"),
            MetricKind::PauseWtW => write!(f, "PauseWtW"),
            MetricKind::PauseCtC => write!(f, "PauseCtC"),
        }
    }
}

/// A timing metric instance, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "timer", rename_all = "snake_case")]
pub enum Metric {
    Iki(IntervalTimer),
    #[serde(rename = "pause_wtw")]
    PauseWtW(IntervalTimer),
    #[serde(rename = "pause_ctc")]
    PauseCtC(IntervalTimer),
}

impl Metric {
    /// Fresh metric of the given kind with both endpoints unset
    pub fn new(kind: MetricKind) -> Self {
        let timer = IntervalTimer::new();
        match kind {
            MetricKind::Iki => Metric::Iki(timer),
            MetricKind::PauseWtW => Metric::PauseWtW(timer),
            MetricKind::PauseCtC => Metric::PauseCtC(timer),
        }
    }

    /// Fresh metric whose timer is already started
    pub fn started(kind: MetricKind, now: NaiveTime) -> Self {
        let mut metric = Self::new(kind);
        metric.timer_mut().start(now);
        metric
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Iki(_) => MetricKind::Iki,
            Metric::PauseWtW(_) => MetricKind::PauseWtW,
            Metric::PauseCtC(_) => MetricKind::PauseCtC,
        }
    }

    pub fn timer(&self) -> &IntervalTimer {
        match self {
            Metric::Iki(t) | Metric::PauseWtW(t) | Metric::PauseCtC(t) => t,
        }
    }

    fn timer_mut(&mut self) -> &mut IntervalTimer {
        match self {
            Metric::Iki(t) | Metric::PauseWtW(t) | Metric::PauseCtC(t) => t,
        }
    }

    pub fn start(&mut self, now: NaiveTime) {
        self.timer_mut().start(now);
    }

    pub fn end(&mut self, now: NaiveTime) {
        self.timer_mut().end(now);
    }

    pub fn duration(&self) -> Option<f64> {
        self.timer().duration()
    }

    /// Duration as an aggregation sample, using the kind's sentinel when unavailable
    pub fn sample(&self) -> f64 {
        self.duration()
            .unwrap_or_else(|| self.kind().unavailable_sample())
    }

    pub fn reset(&mut self) {
        self.timer_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_per_kind_sentinels() {
        assert_eq!(Metric::new(MetricKind::Iki).sample(), -1.0);
        assert_eq!(Metric::new(MetricKind::PauseCtC).sample(), -1.0);
        assert_eq!(Metric::new(MetricKind::PauseWtW).sample(), 0.0);
    }

    #[test]
    fn test_started_metric_sample() {
        let mut metric = Metric::started(MetricKind::PauseWtW, t(9, 0, 0));
        metric.end(t(9, 0, 2));
        assert_eq!(metric.kind(), MetricKind::PauseWtW);
        assert_eq!(metric.sample(), 2.0);
    }

    #[test]
    fn test_reset_then_duration_unavailable() {
        for kind in [MetricKind::Iki, MetricKind::PauseWtW, MetricKind::PauseCtC] {
            let mut metric = Metric::started(kind, t(9, 0, 0));
            metric.end(t(9, 0, 1));
            metric.reset();
            assert_eq!(metric.duration(), None);
            assert_eq!(metric.kind(), kind);
        }
    }

    #[test]
    fn test_metric_descriptors() {
        assert_eq!(MetricKind::Iki.name(), "IKI");
        assert_eq!(MetricKind::PauseCtC.category(), "Keystroke Dynamics");
        assert_eq!(MetricKind::PauseWtW.importance(), 3);
        assert_eq!(MetricKind::PauseWtW.to_string(), "PauseWtW");
    }

    #[test]
    fn test_metric_serialization() {
        let metric = Metric::new(MetricKind::PauseCtC);
        let json = serde_json::to_value(metric).unwrap();
        assert_eq!(json["kind"], "pause_ctc");
    }
}
