//! Growth stages and the stage-requirement table.
//!
//! Stages are strictly ordered. An entry event moves the plant at most one
//! stage forward, and only when the next stage's point *and* streak
//! thresholds are both met. Nothing in normal operation moves it back.

use serde::{Deserialize, Serialize};

/// Plant life-cycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seed,
    Sprout,
    Plant,
    Blooming,
    Tree,
    FruitingTree,
}

/// Thresholds a plant must reach to enter a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequirement {
    pub growth_points: u32,
    pub streak: u32,
}

impl StageRequirement {
    pub fn is_met(&self, growth_points: u32, streak: u32) -> bool {
        growth_points >= self.growth_points && streak >= self.streak
    }
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 6] = [
        GrowthStage::Seed,
        GrowthStage::Sprout,
        GrowthStage::Plant,
        GrowthStage::Blooming,
        GrowthStage::Tree,
        GrowthStage::FruitingTree,
    ];

    /// Position in [`GrowthStage::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<GrowthStage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn is_final(self) -> bool {
        self.next().is_none()
    }

    pub fn requirement(self) -> StageRequirement {
        let (growth_points, streak) = match self {
            GrowthStage::Seed => (1, 1),
            GrowthStage::Sprout => (3, 2),
            GrowthStage::Plant => (7, 3),
            GrowthStage::Blooming => (15, 5),
            GrowthStage::Tree => (25, 7),
            GrowthStage::FruitingTree => (40, 10),
        };
        StageRequirement {
            growth_points,
            streak,
        }
    }

    /// Human-readable name for the presentation layer.
    pub fn display_name(self) -> &'static str {
        match self {
            GrowthStage::Seed => "Seed",
            GrowthStage::Sprout => "Sprout",
            GrowthStage::Plant => "Plant",
            GrowthStage::Blooming => "Blooming",
            GrowthStage::Tree => "Tree",
            GrowthStage::FruitingTree => "Fruiting Tree",
        }
    }
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Walk forward from `current`, taking at most `max_steps` stages and
/// halting at the first stage whose thresholds are not met.
fn walk(current: GrowthStage, growth_points: u32, streak: u32, max_steps: usize) -> GrowthStage {
    let mut stage = current;
    for _ in 0..max_steps {
        match stage.next() {
            Some(candidate) if candidate.requirement().is_met(growth_points, streak) => {
                stage = candidate;
            }
            _ => break,
        }
    }
    stage
}

/// Stage after one entry event.
///
/// Advances at most one stage; never returns a stage below `current`.
pub fn resolve_stage(current: GrowthStage, growth_points: u32, streak: u32) -> GrowthStage {
    walk(current, growth_points, streak, 1)
}

/// Highest stage reachable from Seed by the full requirement walk.
///
/// Only the explicit repair path uses this.
pub fn highest_qualified_stage(growth_points: u32, streak: u32) -> GrowthStage {
    walk(GrowthStage::Seed, growth_points, streak, GrowthStage::ALL.len())
}

/// How far the plant is from its next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub current: GrowthStage,
    pub next: Option<GrowthStage>,
    pub points_needed: u32,
    pub streak_needed: u32,
}

impl StageProgress {
    pub fn compute(current: GrowthStage, growth_points: u32, streak: u32) -> Self {
        match current.next() {
            Some(next) => {
                let req = next.requirement();
                Self {
                    current,
                    next: Some(next),
                    points_needed: req.growth_points.saturating_sub(growth_points),
                    streak_needed: req.streak.saturating_sub(streak),
                }
            }
            None => Self {
                current,
                next: None,
                points_needed: 0,
                streak_needed: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        for pair in GrowthStage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert!(GrowthStage::FruitingTree.is_final());
    }

    #[test]
    fn thresholds_match_table() {
        assert_eq!(
            GrowthStage::Blooming.requirement(),
            StageRequirement {
                growth_points: 15,
                streak: 5
            }
        );
        assert_eq!(GrowthStage::FruitingTree.requirement().growth_points, 40);
        assert_eq!(GrowthStage::FruitingTree.requirement().streak, 10);
    }

    #[test]
    fn seed_stays_seed_on_first_entry() {
        assert_eq!(resolve_stage(GrowthStage::Seed, 1, 1), GrowthStage::Seed);
    }

    #[test]
    fn halts_at_first_unmet_stage() {
        // Sprout (3,2) met, Plant (7,3) not met on points.
        assert_eq!(resolve_stage(GrowthStage::Seed, 3, 3), GrowthStage::Sprout);
    }

    #[test]
    fn both_thresholds_required() {
        assert_eq!(resolve_stage(GrowthStage::Seed, 100, 1), GrowthStage::Seed);
        assert_eq!(resolve_stage(GrowthStage::Seed, 2, 100), GrowthStage::Seed);
    }

    #[test]
    fn never_more_than_one_step() {
        assert_eq!(resolve_stage(GrowthStage::Seed, 100, 100), GrowthStage::Sprout);
        assert_eq!(resolve_stage(GrowthStage::Plant, 15, 5), GrowthStage::Blooming);
    }

    #[test]
    fn never_regresses() {
        assert_eq!(resolve_stage(GrowthStage::Tree, 0, 0), GrowthStage::Tree);
        assert_eq!(
            resolve_stage(GrowthStage::FruitingTree, 1000, 1000),
            GrowthStage::FruitingTree
        );
    }

    #[test]
    fn full_walk_reaches_highest_stage() {
        assert_eq!(highest_qualified_stage(0, 0), GrowthStage::Seed);
        assert_eq!(highest_qualified_stage(15, 5), GrowthStage::Blooming);
        assert_eq!(highest_qualified_stage(100, 100), GrowthStage::FruitingTree);
        // Points qualify for Tree, streak only for Plant.
        assert_eq!(highest_qualified_stage(30, 3), GrowthStage::Plant);
    }

    #[test]
    fn progress_reports_remaining_gap() {
        let p = StageProgress::compute(GrowthStage::Sprout, 4, 3);
        assert_eq!(p.next, Some(GrowthStage::Plant));
        assert_eq!(p.points_needed, 3);
        assert_eq!(p.streak_needed, 0);

        let done = StageProgress::compute(GrowthStage::FruitingTree, 40, 0);
        assert_eq!(done.next, None);
        assert_eq!(done.points_needed, 0);
    }

    #[test]
    fn display_names() {
        assert_eq!(GrowthStage::FruitingTree.to_string(), "Fruiting Tree");
        assert_eq!(GrowthStage::Seed.display_name(), "Seed");
    }
}
