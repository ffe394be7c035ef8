mod config;
pub mod database;
mod memory;
pub mod migrations;
mod store;

pub use config::{
    Config, DayBoundaryConfig, DecayConfig, GrowthConfig, HealthCheckConfig, RewardsConfig,
    ServiceConfig, UserConfig,
};
pub use database::Database;
pub use memory::MemoryStore;
pub use store::{EntryCommit, EntryRecord, EntryStats, PlantStore, VersionedPlant};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory.
///
/// `BLOOMJOURNAL_DATA_DIR` wins if set; otherwise `~/.config/bloomjournal[-dev]/`
/// based on `BLOOMJOURNAL_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("BLOOMJOURNAL_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BLOOMJOURNAL_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("bloomjournal-dev")
            } else {
                base_dir.join("bloomjournal")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
