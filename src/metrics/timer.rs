//! Interval timer primitive
//!
//! A start/end pair of time-of-day stamps. Because the stamps carry no date,
//! an interval that crosses midnight comes out negative and is corrected by
//! adding one day.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Start/end timer over wall-clock time of day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTimer {
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the start, replacing any previous start
    pub fn start(&mut self, now: NaiveTime) {
        self.start = Some(now);
    }

    /// Stamp the end
    pub fn end(&mut self, now: NaiveTime) {
        self.end = Some(now);
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.start
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end
    }

    /// Elapsed seconds, or `None` when either endpoint is unset.
    pub fn duration(&self) -> Option<f64> {
        let (start, end) = (self.start?, self.end?);
        let delta = end.signed_duration_since(start);
        let secs = delta.num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;
        if secs < 0.0 {
            Some(secs + SECONDS_PER_DAY)
        } else {
            Some(secs)
        }
    }

    /// Clear both endpoints
    pub fn reset(&mut self) {
        self.start = None;
        self.end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_unset_timer_is_unavailable() {
        let timer = IntervalTimer::new();
        assert_eq!(timer.duration(), None);
    }

    #[test]
    fn test_start_only_is_unavailable() {
        let mut timer = IntervalTimer::new();
        timer.start(t(10, 0, 0));
        assert_eq!(timer.duration(), None);
    }

    #[test]
    fn test_zero_length_is_distinct_from_unavailable() {
        let mut timer = IntervalTimer::new();
        timer.start(t(10, 0, 0));
        timer.end(t(10, 0, 0));
        assert_eq!(timer.duration(), Some(0.0));
    }

    #[test]
    fn test_fractional_duration() {
        let mut timer = IntervalTimer::new();
        timer.start(NaiveTime::from_hms_milli_opt(10, 0, 0, 250).unwrap());
        timer.end(NaiveTime::from_hms_milli_opt(10, 0, 1, 0).unwrap());
        assert!((timer.duration().unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_midnight_rollover() {
        let mut timer = IntervalTimer::new();
        timer.start(t(23, 59, 58));
        timer.end(t(0, 0, 1));
        assert_eq!(timer.duration(), Some(3.0));
    }

    #[test]
    fn test_restart_overwrites_start() {
        let mut timer = IntervalTimer::new();
        timer.start(t(10, 0, 0));
        timer.start(t(10, 0, 5));
        timer.end(t(10, 0, 6));
        assert_eq!(timer.duration(), Some(1.0));
    }

    #[test]
    fn test_reset_returns_to_unavailable() {
        let mut timer = IntervalTimer::new();
        timer.start(t(10, 0, 0));
        timer.end(t(10, 0, 2));
        timer.reset();
        assert_eq!(timer.duration(), None);
        assert_eq!(timer, IntervalTimer::new());
    }
}
