//! The per-user plant aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health::VisualState;
use super::rewards::{EffectKind, FlowerKind, FruitKind};
use super::stage::{GrowthStage, StageProgress};

pub const MAX_HEALTH: u8 = 100;

/// A flower earned on a streak milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowerAward {
    #[serde(rename = "type")]
    pub kind: FlowerKind,
    pub streak_at_award: u32,
    pub awarded_at: DateTime<Utc>,
}

/// A fruit earned on a streak milestone once the plant is fruiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitAward {
    #[serde(rename = "type")]
    pub kind: FruitKind,
    pub streak_at_award: u32,
    pub awarded_at: DateTime<Utc>,
}

/// Transient UI effect. Cleared under severe neglect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialEffect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// 0.0 ..= 1.0
    pub intensity: f32,
    pub duration_ms: u64,
    pub reason: String,
    pub awarded_at: DateTime<Utc>,
}

/// Everything the engine knows about one user's plant.
///
/// Mutated only by [`PlantEngine`](super::PlantEngine) transitions and
/// persisted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub stage: GrowthStage,
    /// 0 ..= 100
    pub health: u8,
    #[serde(default)]
    pub last_entry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_since_last_entry: u32,
    #[serde(default)]
    pub total_entries: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub growth_points: u32,
    #[serde(default)]
    pub flowers: Vec<FlowerAward>,
    #[serde(default)]
    pub fruits: Vec<FruitAward>,
    #[serde(default)]
    pub special_effects: Vec<SpecialEffect>,
    #[serde(default)]
    pub wilting_started: bool,
    /// Largest `days_since_last_entry` already penalised in the current
    /// neglect period. Reset to 0 by every entry.
    #[serde(default)]
    pub decay_days_applied: u32,
}

impl PlantState {
    /// Fresh onboarding state.
    pub fn new_seedling() -> Self {
        Self {
            stage: GrowthStage::Seed,
            health: MAX_HEALTH,
            last_entry_at: None,
            days_since_last_entry: 0,
            total_entries: 0,
            current_streak: 0,
            longest_streak: 0,
            growth_points: 0,
            flowers: Vec::new(),
            fruits: Vec::new(),
            special_effects: Vec::new(),
            wilting_started: false,
            decay_days_applied: 0,
        }
    }

    pub fn visual_state(&self) -> VisualState {
        VisualState::from_health(self.health, self.wilting_started)
    }

    pub fn stage_progress(&self) -> StageProgress {
        StageProgress::compute(self.stage, self.growth_points, self.current_streak)
    }

    /// Presentation projection.
    pub fn view(&self) -> PlantView {
        PlantView {
            visual_state: self.visual_state(),
            stage_name: self.stage.display_name().to_string(),
            progress: self.stage_progress(),
            state: self.clone(),
        }
    }
}

impl Default for PlantState {
    fn default() -> Self {
        Self::new_seedling()
    }
}

/// What the presentation layer reads: state plus derived projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantView {
    pub state: PlantState,
    pub visual_state: VisualState,
    pub stage_name: String,
    pub progress: StageProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seedling_defaults() {
        let s = PlantState::new_seedling();
        assert_eq!(s.stage, GrowthStage::Seed);
        assert_eq!(s.health, 100);
        assert_eq!(s.growth_points, 0);
        assert_eq!(s.current_streak, 0);
        assert!(s.last_entry_at.is_none());
        assert_eq!(s.visual_state(), VisualState::Healthy);
    }

    #[test]
    fn serializes_reward_kind_as_type() {
        let award = FlowerAward {
            kind: FlowerKind::Tulip,
            streak_at_award: 3,
            awarded_at: Utc::now(),
        };
        let json = serde_json::to_value(&award).unwrap();
        assert_eq!(json["type"], "tulip");
        assert_eq!(json["streak_at_award"], 3);
    }

    #[test]
    fn tolerates_documents_missing_optional_fields() {
        let json = r#"{"stage":"sprout","health":80}"#;
        let s: PlantState = serde_json::from_str(json).unwrap();
        assert_eq!(s.stage, GrowthStage::Sprout);
        assert_eq!(s.health, 80);
        assert!(s.flowers.is_empty());
        assert_eq!(s.decay_days_applied, 0);
    }

    #[test]
    fn view_carries_display_name() {
        let mut s = PlantState::new_seedling();
        s.stage = GrowthStage::FruitingTree;
        let v = s.view();
        assert_eq!(v.stage_name, "Fruiting Tree");
        assert_eq!(v.progress.next, None);
    }
}
