//! Milestone rewards.
//!
//! Whether a reward is granted is fully determined by the post-entry streak
//! and stage. Only the *kind* of flower or fruit is drawn from the injected
//! random source.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::stage::GrowthStage;
use super::state::{FlowerAward, FruitAward, SpecialEffect};

/// Streak multiple that earns a flower.
pub const FLOWER_STREAK_MULTIPLE: u32 = 3;
/// Streak multiple that earns a fruit (fruiting trees only).
pub const FRUIT_STREAK_MULTIPLE: u32 = 5;
/// How long a stage-transition glow lasts.
pub const GLOW_DURATION_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowerKind {
    Rose,
    Tulip,
    Sunflower,
    Daisy,
    Lavender,
}

impl FlowerKind {
    pub const ALL: [FlowerKind; 5] = [
        FlowerKind::Rose,
        FlowerKind::Tulip,
        FlowerKind::Sunflower,
        FlowerKind::Daisy,
        FlowerKind::Lavender,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitKind {
    Apple,
    Cherry,
    Peach,
    Orange,
    Plum,
}

impl FruitKind {
    pub const ALL: [FruitKind; 5] = [
        FruitKind::Apple,
        FruitKind::Cherry,
        FruitKind::Peach,
        FruitKind::Orange,
        FruitKind::Plum,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Glow,
}

/// Rewards produced by one entry event. At most one of each.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardBatch {
    pub flower: Option<FlowerAward>,
    pub fruit: Option<FruitAward>,
    pub effect: Option<SpecialEffect>,
}

impl RewardBatch {
    pub fn is_empty(&self) -> bool {
        self.flower.is_none() && self.fruit.is_none() && self.effect.is_none()
    }
}

pub fn earns_flower(streak: u32) -> bool {
    streak > 0 && streak % FLOWER_STREAK_MULTIPLE == 0
}

pub fn earns_fruit(streak: u32, stage: GrowthStage) -> bool {
    streak > 0 && streak % FRUIT_STREAK_MULTIPLE == 0 && stage == GrowthStage::FruitingTree
}

/// Stateless reward rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardGenerator;

impl RewardGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Rewards for an entry that left the plant at `streak` / `new_stage`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        streak: u32,
        new_stage: GrowthStage,
        old_stage: GrowthStage,
        now: DateTime<Utc>,
    ) -> RewardBatch {
        let flower = earns_flower(streak).then(|| FlowerAward {
            kind: FlowerKind::ALL[rng.gen_range(0..FlowerKind::ALL.len())],
            streak_at_award: streak,
            awarded_at: now,
        });

        let fruit = earns_fruit(streak, new_stage).then(|| FruitAward {
            kind: FruitKind::ALL[rng.gen_range(0..FruitKind::ALL.len())],
            streak_at_award: streak,
            awarded_at: now,
        });

        let effect = (new_stage != old_stage).then(|| SpecialEffect {
            kind: EffectKind::Glow,
            intensity: glow_intensity(new_stage),
            duration_ms: GLOW_DURATION_MS,
            reason: format!("Grew from {old_stage} to {new_stage}"),
            awarded_at: now,
        });

        RewardBatch {
            flower,
            fruit,
            effect,
        }
    }
}

/// Brighter glow for later stages.
fn glow_intensity(stage: GrowthStage) -> f32 {
    (stage.index() + 1) as f32 / GrowthStage::ALL.len() as f32
}
