//! # BloomJournal Core Library
//!
//! Core logic for BloomJournal, a journaling companion whose virtual plant
//! grows with consistent writing and wilts with neglect. Everything is
//! available through the `bloomjournal` CLI binary; other front ends are
//! thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Plant engine**: a pure state machine. Callers hand it the current
//!   [`PlantState`], a timestamp and (for entries) a random source, and it
//!   mutates the state and returns the [`Event`]s that happened.
//! - **Service**: [`PlantService`] keys plants by user id and serializes
//!   transitions per user through compare-and-swap on a [`PlantStore`].
//! - **Storage**: SQLite-backed plants and entry log, plus TOML configuration.
//!
//! ## Key Components
//!
//! - [`PlantEngine`]: growth, streak, decay and reward rules
//! - [`PlantService`]: user-keyed entry points with retry on conflict
//! - [`Database`]: durable [`PlantStore`]
//! - [`Config`]: application configuration management
//! - [`HealthCheckTimer`]: polling cadence for idle decay checks

pub mod clock;
pub mod error;
pub mod events;
pub mod plant;
pub mod schedule;
pub mod service;
pub mod storage;

pub use clock::{Clock, DayBoundary, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, PlantError, Result};
pub use events::Event;
pub use plant::{GrowthStage, PlantEngine, PlantState, PlantView, VisualState};
pub use schedule::HealthCheckTimer;
pub use service::{EntryOutcome, NewEntry, PlantService, Transition};
pub use storage::{Config, Database, EntryStats, MemoryStore, PlantStore};
