//! Time source for the voice core.
//!
//! Last-command timestamps and enrollment dates are read through [`Clock`]
//! so tests can pin them.

use chrono::{Local, NaiveDate};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Milliseconds since the UNIX epoch
    fn now_ms(&self) -> u64;

    /// Local calendar date
    fn today(&self) -> NaiveDate;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a fixed instant, advanced manually
#[derive(Debug, Clone)]
pub struct FixedClock {
    now_ms: std::cell::Cell<u64>,
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(now_ms: u64, today: NaiveDate) -> Self {
        Self {
            now_ms: std::cell::Cell::new(now_ms),
            today,
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
