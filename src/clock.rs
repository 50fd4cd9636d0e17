//! Wall-clock source for the engine
//!
//! Timers work on time-of-day (like a keyboard's local clock), so every
//! reading goes through a [`Clock`] that can be swapped for a manual one in
//! tests and replays.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, NaiveTime, Utc};

/// Source of the current instant.
pub trait Clock {
    /// Current absolute instant
    fn now(&self) -> DateTime<Utc>;

    /// Current time of day, the unit interval timers are stamped with
    fn time_of_day(&self) -> NaiveTime {
        self.now().time()
    }
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn time_of_day(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Manually driven clock.
///
/// Clones share the same instant, so a replay driver can hold one handle and
/// move time forward while the session holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            instant: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.instant.set(instant);
    }

    /// Move the clock forward by a (possibly fractional) number of seconds
    pub fn advance_secs(&self, secs: f64) {
        let nanos = (secs * 1_000_000_000.0).round() as i64;
        self.instant
            .set(self.instant.get() + chrono::Duration::nanoseconds(nanos));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant.get()
    }
}
