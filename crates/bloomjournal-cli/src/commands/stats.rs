use bloomjournal_core::{EntryStats, GrowthStage};
use serde::Serialize;

use super::{open_service, print_json, user_or_default, CmdResult};

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    entries: EntryStats,
    stage: GrowthStage,
    current_streak: u32,
    longest_streak: u32,
    flowers: usize,
    fruits: usize,
}

pub fn run(user: Option<String>) -> CmdResult {
    let (service, config) = open_service()?;
    let user = user_or_default(user, &config);

    let plant = service.load(&user)?;
    let entries = service.entry_stats(&user)?;

    print_json(&StatsReport {
        entries,
        stage: plant.stage,
        current_streak: plant.current_streak,
        longest_streak: plant.longest_streak,
        flowers: plant.flowers.len(),
        fruits: plant.fruits.len(),
    })
}
