//! In-process plant store.
//!
//! Useful for tests and for embedding the engine without SQLite. All state
//! sits behind one mutex, so compare-and-swap is trivially atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::store::{EntryCommit, EntryRecord, PlantStore, VersionedPlant};
use crate::error::{PlantError, Result};
use crate::plant::PlantState;

#[derive(Debug, Default)]
struct Inner {
    plants: HashMap<String, VersionedPlant>,
    entries: Vec<EntryRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PlantStore for MemoryStore {
    fn load_plant(&self, user_id: &str) -> Result<Option<VersionedPlant>> {
        Ok(self.lock().plants.get(user_id).cloned())
    }

    fn insert_plant(&self, user_id: &str, state: &PlantState) -> Result<VersionedPlant> {
        let mut inner = self.lock();
        if inner.plants.contains_key(user_id) {
            return Err(PlantError::AlreadyExists {
                user_id: user_id.to_string(),
            }
            .into());
        }
        let plant = VersionedPlant {
            state: state.clone(),
            version: 1,
        };
        inner.plants.insert(user_id.to_string(), plant.clone());
        Ok(plant)
    }

    fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<Option<u64>> {
        let mut inner = self.lock();
        match inner.plants.get_mut(user_id) {
            Some(current) if current.version == expected_version => {
                current.state = state.clone();
                current.version += 1;
                Ok(Some(current.version))
            }
            _ => Ok(None),
        }
    }

    fn commit_entry(
        &self,
        entry: &EntryRecord,
        expected_version: u64,
        state: &PlantState,
    ) -> Result<EntryCommit> {
        let mut inner = self.lock();
        if inner.entries.iter().any(|e| e.entry_id == entry.entry_id) {
            return Ok(EntryCommit::Duplicate);
        }
        let Some(current) = inner.plants.get_mut(&entry.user_id) else {
            return Ok(EntryCommit::Conflict);
        };
        if current.version != expected_version {
            return Ok(EntryCommit::Conflict);
        }
        current.state = state.clone();
        current.version += 1;
        let version = current.version;
        inner.entries.push(entry.clone());
        Ok(EntryCommit::Committed { version })
    }

    fn entries_for(&self, user_id: &str) -> Result<Vec<EntryRecord>> {
        let mut entries: Vec<EntryRecord> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.occurred_at);
        Ok(entries)
    }
}
