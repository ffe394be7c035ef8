use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plant::{EffectKind, FlowerKind, FruitKind, GrowthStage};

/// Every plant state change produces one or more Events.
/// The service logs them; the CLI can print them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    EntryRecorded {
        total_entries: u32,
        growth_points: u32,
        at: DateTime<Utc>,
    },
    StreakChanged {
        from: u32,
        to: u32,
        /// Calendar days since the previous entry (None for the first entry).
        gap_days: Option<u32>,
        at: DateTime<Utc>,
    },
    StageAdvanced {
        from: GrowthStage,
        to: GrowthStage,
        at: DateTime<Utc>,
    },
    FlowerAwarded {
        kind: FlowerKind,
        streak: u32,
        at: DateTime<Utc>,
    },
    FruitAwarded {
        kind: FruitKind,
        streak: u32,
        at: DateTime<Utc>,
    },
    EffectAwarded {
        kind: EffectKind,
        reason: String,
        at: DateTime<Utc>,
    },
    HealthBoosted {
        from: u8,
        to: u8,
        at: DateTime<Utc>,
    },
    /// Idle decay lowered health.
    DecayApplied {
        days_since: u32,
        decrease: u32,
        health: u8,
        at: DateTime<Utc>,
    },
    WiltingStarted {
        days_since: u32,
        at: DateTime<Utc>,
    },
    StreakForfeited {
        streak: u32,
        at: DateTime<Utc>,
    },
    /// Severe neglect took the newest flower.
    FlowerPruned {
        kind: FlowerKind,
        at: DateTime<Utc>,
    },
    EffectsCleared {
        count: usize,
        at: DateTime<Utc>,
    },
    /// Explicit repair raised a lagging stage.
    StageRepaired {
        from: GrowthStage,
        to: GrowthStage,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::EntryRecorded { at, .. }
            | Event::StreakChanged { at, .. }
            | Event::StageAdvanced { at, .. }
            | Event::FlowerAwarded { at, .. }
            | Event::FruitAwarded { at, .. }
            | Event::EffectAwarded { at, .. }
            | Event::HealthBoosted { at, .. }
            | Event::DecayApplied { at, .. }
            | Event::WiltingStarted { at, .. }
            | Event::StreakForfeited { at, .. }
            | Event::FlowerPruned { at, .. }
            | Event::EffectsCleared { at, .. }
            | Event::StageRepaired { at, .. } => *at,
        }
    }
}
