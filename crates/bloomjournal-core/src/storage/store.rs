//! The storage seam the service writes through.
//!
//! A store keeps one versioned plant document per user plus the entry log
//! used for de-duplication and statistics. Writes to a plant go through
//! [`PlantStore::compare_and_swap`] so a transition computed from a stale
//! read is rejected instead of overwriting a concurrent one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::DayBoundary;
use crate::error::Result;
use crate::plant::PlantState;

/// A plant document together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedPlant {
    pub state: PlantState,
    pub version: u64,
}

/// One journal entry as the engine sees it: identity, time and a word count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry_id: String,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub word_count: u32,
}

/// Result of [`PlantStore::commit_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCommit {
    /// Entry logged and plant written at this new version.
    Committed { version: u64 },
    /// The entry id was already logged; nothing written.
    Duplicate,
    /// Another writer moved the plant; nothing written.
    Conflict,
}

/// Durable per-user plant storage.
pub trait PlantStore: Send + Sync {
    /// Current plant document, if the user has been onboarded.
    fn load_plant(&self, user_id: &str) -> Result<Option<VersionedPlant>>;

    /// Create the plant document. Fails with `PlantError::AlreadyExists`.
    fn insert_plant(&self, user_id: &str, state: &PlantState) -> Result<VersionedPlant>;

    /// Replace the document only if it is still at `expected_version`.
    ///
    /// Returns the new version on success, `None` if another writer won.
    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<Option<u64>>;

    /// Append `entry` and swap in `state` as one atomic step.
    ///
    /// Either both the log row and the plant document are written, or
    /// neither is. A known `entry_id` yields [`EntryCommit::Duplicate`]; a
    /// version mismatch yields [`EntryCommit::Conflict`] and leaves the log
    /// untouched so the caller can recompute and retry.
    fn commit_entry(
        &self,
        entry: &EntryRecord,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<EntryCommit>;

    /// All entries of a user, oldest first.
    fn entries_for(&self, user_id: &str) -> Result<Vec<EntryRecord>>;
}

/// Journal statistics derived from the entry log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryStats {
    pub total_entries: u64,
    pub entries_today: u64,
    pub total_words: u64,
    pub active_days: u64,
    pub first_entry_at: Option<DateTime<Utc>>,
    pub last_entry_at: Option<DateTime<Utc>>,
}

impl EntryStats {
    pub fn from_entries(entries: &[EntryRecord], now: DateTime<Utc>, boundary: &DayBoundary) -> Self {
        let today = boundary.day_of(now);
        let mut stats = EntryStats::default();
        let mut days = BTreeSet::new();

        for entry in entries {
            stats.total_entries += 1;
            stats.total_words += u64::from(entry.word_count);
            let day = boundary.day_of(entry.occurred_at);
            if day == today {
                stats.entries_today += 1;
            }
            days.insert(day);
            stats.first_entry_at = Some(match stats.first_entry_at {
                Some(first) if first <= entry.occurred_at => first,
                _ => entry.occurred_at,
            });
            stats.last_entry_at = Some(match stats.last_entry_at {
                Some(last) if last >= entry.occurred_at => last,
                _ => entry.occurred_at,
            });
        }

        stats.active_days = days.len() as u64;
        stats
    }
}
