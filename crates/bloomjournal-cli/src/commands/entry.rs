use bloomjournal_core::{Event, NewEntry, PlantView};
use clap::Subcommand;
use serde::Serialize;

use super::{open_service, parse_time, print_json, user_or_default, CmdResult};

#[derive(Subcommand)]
pub enum EntryAction {
    /// Record a journal entry and grow the plant
    Add {
        #[arg(long)]
        user: Option<String>,
        /// When the entry was written (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
        /// Entry id; re-submitting the same id is a no-op
        #[arg(long)]
        id: Option<String>,
        /// Word count of the entry
        #[arg(long, default_value = "0")]
        words: u32,
    },
}

#[derive(Serialize)]
struct EntryReport {
    entry_id: String,
    applied: bool,
    plant: PlantView,
    events: Vec<Event>,
}

pub fn run(action: EntryAction) -> CmdResult {
    let (service, config) = open_service()?;

    match action {
        EntryAction::Add {
            user,
            at,
            id,
            words,
        } => {
            let user = user_or_default(user, &config);
            let occurred_at = parse_time(at.as_deref())?.unwrap_or_else(|| service.now());
            let outcome = service.record_entry(
                &user,
                NewEntry {
                    entry_id: id,
                    occurred_at,
                    word_count: words,
                },
            )?;
            print_json(&EntryReport {
                entry_id: outcome.entry_id,
                applied: outcome.applied,
                plant: outcome.state.view(),
                events: outcome.events,
            })?;
        }
    }
    Ok(())
}
