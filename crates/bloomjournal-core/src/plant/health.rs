//! Health boost and idle decay.
//!
//! Decay is a function of calendar days since the last entry. Within one
//! neglect period the total penalty is `decrease_for(days_since)`; each
//! check subtracts only the part not yet applied, tracked in
//! `PlantState::decay_days_applied`. Health after any sequence of checks
//! therefore equals `health_at_last_entry - decrease_for(days_since)`
//! (floored at 0), and repeating a check for the same day is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{FlowerAward, PlantState, MAX_HEALTH};
use crate::clock::DayBoundary;

const DEAD_AT_OR_BELOW: u8 = 20;
const WILTING_AT_OR_BELOW: u8 = 50;

/// Tunables for the health model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Health restored by an entry
    pub entry_boost: u8,
    /// Idle days tolerated before decay starts
    pub grace_days: u32,
    /// Penalty per idle day past the grace window
    pub penalty_per_day: u32,
    /// Cap on the penalty for one neglect period
    pub max_penalty: u32,
    /// Idle days at which the newest flower and all effects are lost
    pub severe_neglect_days: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            entry_boost: 10,
            grace_days: 2,
            penalty_per_day: 8,
            max_penalty: 50,
            severe_neglect_days: 7,
        }
    }
}

/// Derived presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    Healthy,
    Wilting,
    Dead,
}

impl VisualState {
    pub fn from_health(health: u8, wilting_started: bool) -> Self {
        if health <= DEAD_AT_OR_BELOW {
            VisualState::Dead
        } else if health <= WILTING_AT_OR_BELOW || wilting_started {
            VisualState::Wilting
        } else {
            VisualState::Healthy
        }
    }
}

/// Result of an entry boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostOutcome {
    pub health_before: u8,
    pub health_after: u8,
}

/// What a decay check changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecayOutcome {
    /// `None` when the plant has never received an entry
    pub days_since: Option<u32>,
    pub health_before: u8,
    pub health_after: u8,
    /// Penalty subtracted by this check
    pub decrease: u32,
    /// Streak value that was forfeited, if any
    pub forfeited_streak: Option<u32>,
    pub wilting_began: bool,
    pub pruned_flower: Option<FlowerAward>,
    pub effects_cleared: usize,
}

impl DecayOutcome {
    pub fn changed_health(&self) -> bool {
        self.decrease > 0 && self.health_before != self.health_after
    }
}

/// Applies the boost and decay rules of a [`HealthPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthModel {
    policy: HealthPolicy,
}

impl HealthModel {
    pub fn new(policy: HealthPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Total penalty for a neglect period that has lasted `days_since` days.
    pub fn decrease_for(&self, days_since: u32) -> u32 {
        if days_since <= self.policy.grace_days {
            return 0;
        }
        (days_since - self.policy.grace_days)
            .saturating_mul(self.policy.penalty_per_day)
            .min(self.policy.max_penalty)
    }

    /// Entry-day boost: raise health, end any neglect period.
    pub fn apply_entry_boost(&self, state: &mut PlantState) -> BoostOutcome {
        let health_before = state.health.min(MAX_HEALTH);
        state.health = health_before
            .saturating_add(self.policy.entry_boost)
            .min(MAX_HEALTH);
        state.days_since_last_entry = 0;
        state.wilting_started = false;
        state.decay_days_applied = 0;
        BoostOutcome {
            health_before,
            health_after: state.health,
        }
    }

    /// Idle decay check at `now`.
    pub fn apply_decay(
        &self,
        state: &mut PlantState,
        now: DateTime<Utc>,
        boundary: &DayBoundary,
    ) -> DecayOutcome {
        let mut outcome = DecayOutcome {
            health_before: state.health,
            health_after: state.health,
            ..DecayOutcome::default()
        };

        let Some(last_entry_at) = state.last_entry_at else {
            return outcome;
        };

        let days_since = boundary.days_between(last_entry_at, now);
        state.days_since_last_entry = days_since;
        outcome.days_since = Some(days_since);

        if days_since <= self.policy.grace_days || days_since <= state.decay_days_applied {
            return outcome;
        }

        let decrease = self
            .decrease_for(days_since)
            .saturating_sub(self.decrease_for(state.decay_days_applied));
        let health = u32::from(state.health.min(MAX_HEALTH)).saturating_sub(decrease);
        state.health = u8::try_from(health).unwrap_or(MAX_HEALTH);
        outcome.decrease = decrease;
        outcome.health_after = state.health;

        if state.current_streak > 0 {
            outcome.forfeited_streak = Some(state.current_streak);
            state.current_streak = 0;
        }

        if !state.wilting_started {
            state.wilting_started = true;
            outcome.wilting_began = true;
        }

        if days_since >= self.policy.severe_neglect_days
            && state.decay_days_applied < self.policy.severe_neglect_days
        {
            outcome.pruned_flower = state.flowers.pop();
            outcome.effects_cleared = state.special_effects.len();
            state.special_effects.clear();
        }

        state.decay_days_applied = days_since;
        outcome
    }
}
