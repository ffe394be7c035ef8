//! Wall-clock provider and calendar-day arithmetic.
//!
//! Streaks and decay both count *calendar days*, so every elapsed-day
//! computation in the engine goes through [`DayBoundary`]. A boundary is a
//! fixed UTC offset; midnight in that offset starts a new day.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Source of "now" for the service layer.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Where one calendar day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBoundary {
    offset_minutes: i32,
}

impl DayBoundary {
    /// UTC midnight.
    pub fn utc() -> Self {
        Self { offset_minutes: 0 }
    }

    /// Midnight at a fixed offset east of UTC. Offsets outside ±23:59 fall back to UTC.
    pub fn from_offset_minutes(offset_minutes: i32) -> Self {
        if fixed_offset(offset_minutes).is_some() {
            Self { offset_minutes }
        } else {
            tracing::warn!(offset_minutes, "day boundary offset out of range, using UTC");
            Self::utc()
        }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    fn offset(&self) -> FixedOffset {
        fixed_offset(self.offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of `at` under this boundary.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    /// Whole calendar days from `earlier` to `later`.
    ///
    /// Negative spans (clock skew, out-of-order events) clamp to 0.
    pub fn days_between(&self, earlier: DateTime<Utc>, later: DateTime<Utc>) -> u32 {
        let days = (self.day_of(later) - self.day_of(earlier)).num_days();
        if days < 0 {
            tracing::warn!(
                %earlier,
                %later,
                days,
                "negative elapsed-day span clamped to zero"
            );
            return 0;
        }
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

fn fixed_offset(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::utc()
    }
}
