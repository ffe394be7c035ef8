pub mod config;
pub mod entry;
pub mod plant;
pub mod stats;

use bloomjournal_core::{Config, Database, PlantService};
use chrono::{DateTime, Utc};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Service over the on-disk database, configured from `config.toml`.
pub fn open_service() -> Result<(PlantService<Database>, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    Ok((PlantService::from_config(db, &config), config))
}

pub fn user_or_default(user: Option<String>, config: &Config) -> String {
    user.unwrap_or_else(|| config.user.default_id.clone())
}

pub fn parse_time(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, Box<dyn std::error::Error>> {
    match raw {
        Some(s) => Ok(Some(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))),
        None => Ok(None),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
