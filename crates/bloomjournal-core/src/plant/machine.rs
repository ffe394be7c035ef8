//! Plant state machine.
//!
//! Composes the streak calculator, stage resolver, reward generator and
//! health model into the two transitions the rest of the system uses:
//!
//! ```text
//! entry   : streak -> stage -> rewards -> boost -> merge
//! check   : decay (may zero the streak and prune rewards)
//! ```
//!
//! Both are pure over the given [`PlantState`]: no I/O, no clock reads.
//! Serialising concurrent transitions for one user is the caller's job
//! (see [`PlantService`](crate::service::PlantService)).

use chrono::{DateTime, Utc};
use rand::Rng;

use super::health::{HealthModel, HealthPolicy};
use super::rewards::RewardGenerator;
use super::stage::{highest_qualified_stage, resolve_stage};
use super::state::{PlantState, MAX_HEALTH};
use super::streak::compute_streak;
use crate::clock::DayBoundary;
use crate::events::Event;

/// Stateless engine holding the policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlantEngine {
    boundary: DayBoundary,
    health: HealthModel,
    rewards: RewardGenerator,
}

impl PlantEngine {
    pub fn new(boundary: DayBoundary, policy: HealthPolicy) -> Self {
        Self {
            boundary,
            health: HealthModel::new(policy),
            rewards: RewardGenerator::new(),
        }
    }

    pub fn boundary(&self) -> &DayBoundary {
        &self.boundary
    }

    /// Apply one journal entry that occurred at `occurred_at`.
    ///
    /// Not idempotent: callers must apply each logical entry once.
    pub fn on_entry_added<R: Rng + ?Sized>(
        &self,
        state: &mut PlantState,
        occurred_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<Event> {
        let mut events = Vec::new();

        state.total_entries = state.total_entries.saturating_add(1);
        state.growth_points = state.growth_points.saturating_add(1);
        events.push(Event::EntryRecorded {
            total_entries: state.total_entries,
            growth_points: state.growth_points,
            at: occurred_at,
        });

        let streak = compute_streak(
            state.current_streak,
            state.last_entry_at,
            occurred_at,
            &self.boundary,
        );
        state.current_streak = streak.current;
        state.longest_streak = state.longest_streak.max(streak.current);
        if streak.changed() {
            events.push(Event::StreakChanged {
                from: streak.previous,
                to: streak.current,
                gap_days: streak.gap_days,
                at: occurred_at,
            });
        }

        let old_stage = state.stage;
        let new_stage = resolve_stage(old_stage, state.growth_points, state.current_streak);
        state.stage = new_stage;
        if new_stage != old_stage {
            events.push(Event::StageAdvanced {
                from: old_stage,
                to: new_stage,
                at: occurred_at,
            });
        }

        let batch = self
            .rewards
            .generate(rng, state.current_streak, new_stage, old_stage, occurred_at);

        let boost = self.health.apply_entry_boost(state);
        if boost.health_after != boost.health_before {
            events.push(Event::HealthBoosted {
                from: boost.health_before,
                to: boost.health_after,
                at: occurred_at,
            });
        }

        if let Some(flower) = batch.flower {
            events.push(Event::FlowerAwarded {
                kind: flower.kind,
                streak: flower.streak_at_award,
                at: occurred_at,
            });
            state.flowers.push(flower);
        }
        if let Some(fruit) = batch.fruit {
            events.push(Event::FruitAwarded {
                kind: fruit.kind,
                streak: fruit.streak_at_award,
                at: occurred_at,
            });
            state.fruits.push(fruit);
        }
        if let Some(effect) = batch.effect {
            events.push(Event::EffectAwarded {
                kind: effect.kind,
                reason: effect.reason.clone(),
                at: occurred_at,
            });
            state.special_effects.push(effect);
        }

        state.last_entry_at = Some(match state.last_entry_at {
            Some(last) if last > occurred_at => last,
            _ => occurred_at,
        });

        events
    }

    /// Periodic idle check at `now`. Never touches stage, points or entry count.
    ///
    /// Idempotent for a fixed `now`.
    pub fn on_health_check(&self, state: &mut PlantState, now: DateTime<Utc>) -> Vec<Event> {
        let outcome = self.health.apply_decay(state, now, &self.boundary);
        let mut events = Vec::new();
        let Some(days_since) = outcome.days_since else {
            return events;
        };

        if outcome.decrease > 0 {
            events.push(Event::DecayApplied {
                days_since,
                decrease: outcome.decrease,
                health: outcome.health_after,
                at: now,
            });
        }
        if outcome.wilting_began {
            events.push(Event::WiltingStarted { days_since, at: now });
        }
        if let Some(streak) = outcome.forfeited_streak {
            events.push(Event::StreakForfeited { streak, at: now });
        }
        if let Some(flower) = outcome.pruned_flower {
            events.push(Event::FlowerPruned {
                kind: flower.kind,
                at: now,
            });
        }
        if outcome.effects_cleared > 0 {
            events.push(Event::EffectsCleared {
                count: outcome.effects_cleared,
                at: now,
            });
        }
        events
    }

    /// Explicit repair: catch a lagging stage up to what the current points
    /// and streak qualify for.
    ///
    /// Never lowers the stage and never revokes rewards. Also restores the
    /// `longest_streak >= current_streak` and health-range invariants.
    pub fn recalculate_stage(&self, state: &mut PlantState, now: DateTime<Utc>) -> Vec<Event> {
        state.longest_streak = state.longest_streak.max(state.current_streak);
        state.health = state.health.min(MAX_HEALTH);

        let qualified = highest_qualified_stage(state.growth_points, state.current_streak);
        if qualified > state.stage {
            let from = state.stage;
            state.stage = qualified;
            return vec![Event::StageRepaired {
                from,
                to: qualified,
                at: now,
            }];
        }
        Vec::new()
    }
}
