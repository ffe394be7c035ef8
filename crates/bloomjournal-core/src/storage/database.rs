//! SQLite-backed plant store.
//!
//! Provides persistent storage for:
//! - One versioned plant document per user (JSON in the `plants` table)
//! - The journal entry log used for de-duplication and statistics

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use super::store::{EntryCommit, EntryRecord, PlantStore, VersionedPlant};
use crate::error::{CoreError, DatabaseError, PlantError, Result};
use crate::plant::PlantState;

/// SQLite database for plant storage.
///
/// The connection sits behind a mutex so one `Database` can be shared by the
/// service across threads; cross-process safety comes from the version check
/// in [`PlantStore::compare_and_swap`] and [`PlantStore::commit_entry`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/bloomjournal/bloomjournal.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("bloomjournal.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn decode_state(user_id: &str, json: &str) -> Result<PlantState> {
    serde_json::from_str(json).map_err(|e| {
        DatabaseError::CorruptRecord {
            user_id: user_id.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn parse_timestamp(user_id: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::CorruptRecord {
                user_id: user_id.to_string(),
                message: format!("bad timestamp '{raw}': {e}"),
            }
            .into()
        })
}

fn version_param(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| CoreError::Custom(format!("version {version} out of range")))
}

impl PlantStore for Database {
    fn load_plant(&self, user_id: &str) -> Result<Option<VersionedPlant>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT state, version FROM plants WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((json, version)) => Ok(Some(VersionedPlant {
                state: decode_state(user_id, &json)?,
                version: version as u64,
            })),
            None => Ok(None),
        }
    }

    fn insert_plant(&self, user_id: &str, state: &PlantState) -> Result<VersionedPlant> {
        let json = serde_json::to_string(state)?;
        let inserted = self.conn().execute(
            "INSERT INTO plants (user_id, state, version, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(user_id) DO NOTHING",
            params![user_id, json, Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            return Err(PlantError::AlreadyExists {
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(VersionedPlant {
            state: state.clone(),
            version: 1,
        })
    }

    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<Option<u64>> {
        let json = serde_json::to_string(state)?;
        let expected = version_param(expected_version)?;
        let updated = self.conn().execute(
            "UPDATE plants SET state = ?1, version = version + 1, updated_at = ?2
             WHERE user_id = ?3 AND version = ?4",
            params![json, Utc::now().to_rfc3339(), user_id, expected],
        )?;
        Ok((updated == 1).then_some(expected_version + 1))
    }

    fn commit_entry(
        &self,
        entry: &EntryRecord,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<EntryCommit> {
        let json = serde_json::to_string(state)?;
        let expected = version_param(expected_version)?;
        let conn = self.conn();
        // Dropping `tx` without commit rolls back the entry row.
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO entries (entry_id, user_id, occurred_at, word_count)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.entry_id,
                entry.user_id,
                entry.occurred_at.to_rfc3339(),
                entry.word_count,
            ],
        )?;
        if inserted == 0 {
            return Ok(EntryCommit::Duplicate);
        }

        let updated = tx.execute(
            "UPDATE plants SET state = ?1, version = version + 1, updated_at = ?2
             WHERE user_id = ?3 AND version = ?4",
            params![json, Utc::now().to_rfc3339(), entry.user_id, expected],
        )?;
        if updated == 0 {
            return Ok(EntryCommit::Conflict);
        }

        tx.commit()?;
        Ok(EntryCommit::Committed {
            version: expected_version + 1,
        })
    }

    fn entries_for(&self, user_id: &str) -> Result<Vec<EntryRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT entry_id, occurred_at, word_count FROM entries
             WHERE user_id = ?1
             ORDER BY occurred_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (entry_id, occurred_at, word_count) = row?;
            entries.push(EntryRecord {
                entry_id,
                user_id: user_id.to_string(),
                occurred_at: parse_timestamp(user_id, &occurred_at)?,
                word_count,
            });
        }
        Ok(entries)
    }
}
