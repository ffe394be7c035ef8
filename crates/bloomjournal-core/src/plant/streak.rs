//! Consecutive-day streak calculation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::DayBoundary;

/// Outcome of folding one entry into the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub previous: u32,
    pub current: u32,
    /// Calendar days since the prior entry; `None` for a first entry.
    pub gap_days: Option<u32>,
}

impl StreakUpdate {
    pub fn was_reset(&self) -> bool {
        matches!(self.gap_days, Some(gap) if gap > 1)
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Streak after an entry at `now`, given the streak and time of the previous entry.
///
/// - first entry: 1
/// - same calendar day: unchanged
/// - next calendar day: +1
/// - longer gap: back to 1
///
/// Out-of-order timestamps count as the same day.
pub fn compute_streak(
    previous_streak: u32,
    last_entry_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    boundary: &DayBoundary,
) -> StreakUpdate {
    let gap_days = last_entry_at.map(|last| boundary.days_between(last, now));
    let current = match gap_days {
        None => 1,
        Some(0) => previous_streak,
        Some(1) => previous_streak.saturating_add(1),
        Some(_) => 1,
    };
    StreakUpdate {
        previous: previous_streak,
        current,
        gap_days,
    }
}
