//! Plant growth engine: streaks, stages, rewards, health, and the state
//! machine that ties them together.

mod health;
mod machine;
mod rewards;
mod stage;
mod state;
mod streak;

pub use health::{BoostOutcome, DecayOutcome, HealthModel, HealthPolicy, VisualState};
pub use machine::PlantEngine;
pub use rewards::{
    earns_flower, earns_fruit, EffectKind, FlowerKind, FruitKind, RewardBatch, RewardGenerator,
    FLOWER_STREAK_MULTIPLE, FRUIT_STREAK_MULTIPLE, GLOW_DURATION_MS,
};
pub use stage::{
    highest_qualified_stage, resolve_stage, GrowthStage, StageProgress, StageRequirement,
};
pub use state::{FlowerAward, FruitAward, PlantState, PlantView, SpecialEffect, MAX_HEALTH};
pub use streak::{compute_streak, StreakUpdate};
