//! User-keyed entry points over a [`PlantStore`].
//!
//! Every transition is a read-compute-swap against the store: load the
//! plant with its version, run the engine on a copy, and write it back with
//! [`PlantStore::compare_and_swap`]. A lost swap means another transition for
//! the same user landed first, so the service reloads and recomputes from
//! the fresh state. A check racing an entry therefore never applies decay
//! to a stale `last_entry_at`, and a boost is never lost. Recorded entries
//! go through [`PlantStore::commit_entry`] instead, which writes the log row
//! and the plant in the same atomic step.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rand::{RngCore, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{PlantError, Result};
use crate::events::Event;
use crate::plant::{PlantEngine, PlantState, PlantView};
use crate::storage::{Config, EntryCommit, EntryRecord, EntryStats, PlantStore};

/// Result of one committed (or no-op) transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: PlantState,
    pub events: Vec<Event>,
    pub version: u64,
}

/// A journal entry as submitted by the journaling layer.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Stable identity; generated when absent.
    pub entry_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub word_count: u32,
}

/// Outcome of [`PlantService::record_entry`].
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub entry_id: String,
    /// `false` when the entry id had already been recorded.
    pub applied: bool,
    pub state: PlantState,
    pub events: Vec<Event>,
}

pub struct PlantService<S, C = SystemClock, R = Mcg128Xsl64> {
    store: S,
    clock: C,
    engine: PlantEngine,
    rng: Mutex<R>,
    max_cas_attempts: u32,
}

impl<S: PlantStore> PlantService<S> {
    /// Service on the wall clock with engine policy and RNG seed from `config`.
    pub fn from_config(store: S, config: &Config) -> Self {
        let rng = match config.rewards.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self::new(
            store,
            SystemClock,
            PlantEngine::new(config.day_boundary(), config.health_policy()),
            rng,
        )
        .with_max_cas_attempts(config.service.max_cas_attempts)
    }
}

impl<S, C, R> PlantService<S, C, R>
where
    S: PlantStore,
    C: Clock,
    R: RngCore + Send,
{
    pub fn new(store: S, clock: C, engine: PlantEngine, rng: R) -> Self {
        Self {
            store,
            clock,
            engine,
            rng: Mutex::new(rng),
            max_cas_attempts: 5,
        }
    }

    pub fn with_max_cas_attempts(mut self, attempts: u32) -> Self {
        self.max_cas_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create the Seed state for a new user.
    pub fn onboard(&self, user_id: &str) -> Result<PlantState> {
        let plant = self.store.insert_plant(user_id, &PlantState::new_seedling())?;
        tracing::info!(user_id, "plant created");
        Ok(plant.state)
    }

    /// Current stored state.
    pub fn load(&self, user_id: &str) -> Result<PlantState> {
        self.store
            .load_plant(user_id)?
            .map(|p| p.state)
            .ok_or_else(|| not_found(user_id))
    }

    /// State plus presentation projections.
    pub fn view(&self, user_id: &str) -> Result<PlantView> {
        Ok(self.load(user_id)?.view())
    }

    /// Apply an entry that has already been durably recorded upstream.
    ///
    /// Performs no de-duplication; see [`record_entry`](Self::record_entry).
    pub fn on_entry_added(&self, user_id: &str, occurred_at: DateTime<Utc>) -> Result<PlantState> {
        Ok(self.apply_entry(user_id, occurred_at)?.state)
    }

    /// Idle decay check at `now`. Safe to retry.
    pub fn on_health_check(&self, user_id: &str, now: DateTime<Utc>) -> Result<PlantState> {
        Ok(self.check(user_id, now)?.state)
    }

    /// Idle decay check at the clock's current time.
    pub fn health_check_now(&self, user_id: &str) -> Result<Transition> {
        self.check(user_id, self.clock.now())
    }

    /// Like [`on_health_check`](Self::on_health_check), keeping the events.
    pub fn health_check_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Transition> {
        self.check(user_id, now)
    }

    /// Record an entry in the log and apply it once.
    ///
    /// The log row and the plant update commit together, so a failure at
    /// any point leaves the entry unrecorded and safe to resubmit. A
    /// repeated `entry_id` is not re-applied; the current state is returned.
    pub fn record_entry(&self, user_id: &str, entry: NewEntry) -> Result<EntryOutcome> {
        let entry_id = entry
            .entry_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = EntryRecord {
            entry_id: entry_id.clone(),
            user_id: user_id.to_string(),
            occurred_at: entry.occurred_at,
            word_count: entry.word_count,
        };

        for attempt in 1..=self.max_cas_attempts {
            let current = self
                .store
                .load_plant(user_id)?
                .ok_or_else(|| not_found(user_id))?;

            let mut next = current.state.clone();
            let events = {
                let mut rng = self.rng();
                self.engine
                    .on_entry_added(&mut next, entry.occurred_at, &mut *rng)
            };

            match self.store.commit_entry(&record, current.version, &next)? {
                EntryCommit::Committed { .. } => {
                    log_events(user_id, &events);
                    return Ok(EntryOutcome {
                        entry_id,
                        applied: true,
                        state: next,
                        events,
                    });
                }
                EntryCommit::Duplicate => {
                    tracing::warn!(user_id, entry_id = %entry_id, "duplicate entry ignored");
                    return Ok(EntryOutcome {
                        entry_id,
                        applied: false,
                        state: current.state,
                        events: Vec::new(),
                    });
                }
                EntryCommit::Conflict => {
                    tracing::warn!(user_id, attempt, "plant changed concurrently, retrying");
                }
            }
        }

        Err(conflict(user_id, self.max_cas_attempts))
    }

    /// Explicit stage repair. Never lowers the stage or revokes rewards.
    pub fn recalculate_stage(&self, user_id: &str) -> Result<Transition> {
        let now = self.clock.now();
        self.transact(user_id, |state| self.engine.recalculate_stage(state, now))
    }

    pub fn entry_stats(&self, user_id: &str) -> Result<EntryStats> {
        let entries = self.store.entries_for(user_id)?;
        Ok(EntryStats::from_entries(
            &entries,
            self.clock.now(),
            self.engine.boundary(),
        ))
    }

    fn apply_entry(&self, user_id: &str, occurred_at: DateTime<Utc>) -> Result<Transition> {
        self.transact(user_id, |state| {
            let mut rng = self.rng();
            self.engine.on_entry_added(state, occurred_at, &mut *rng)
        })
    }

    fn check(&self, user_id: &str, now: DateTime<Utc>) -> Result<Transition> {
        self.transact(user_id, |state| self.engine.on_health_check(state, now))
    }

    fn rng(&self) -> MutexGuard<'_, R> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load, apply `op` to a copy, and swap it in; retry on a lost swap.
    fn transact<F>(&self, user_id: &str, mut op: F) -> Result<Transition>
    where
        F: FnMut(&mut PlantState) -> Vec<Event>,
    {
        for attempt in 1..=self.max_cas_attempts {
            let current = self
                .store
                .load_plant(user_id)?
                .ok_or_else(|| not_found(user_id))?;

            let mut next = current.state.clone();
            let events = op(&mut next);

            if next == current.state {
                return Ok(Transition {
                    state: next,
                    events,
                    version: current.version,
                });
            }

            match self.store.compare_and_swap(user_id, current.version, &next)? {
                Some(version) => {
                    log_events(user_id, &events);
                    return Ok(Transition {
                        state: next,
                        events,
                        version,
                    });
                }
                None => {
                    tracing::warn!(user_id, attempt, "plant changed concurrently, retrying");
                }
            }
        }

        Err(conflict(user_id, self.max_cas_attempts))
    }
}

fn conflict(user_id: &str, attempts: u32) -> crate::error::CoreError {
    PlantError::Conflict {
        user_id: user_id.to_string(),
        attempts,
    }
    .into()
}

fn not_found(user_id: &str) -> crate::error::CoreError {
    PlantError::NotFound {
        user_id: user_id.to_string(),
    }
    .into()
}

fn log_events(user_id: &str, events: &[Event]) {
    for event in events {
        match event {
            Event::StageAdvanced { from, to, .. } | Event::StageRepaired { from, to, .. } => {
                tracing::info!(user_id, %from, %to, "plant stage advanced");
            }
            Event::DecayApplied {
                days_since,
                decrease,
                health,
                ..
            } => {
                tracing::info!(user_id, days_since, decrease, health, "decay applied");
            }
            other => tracing::debug!(user_id, event = ?other, "plant event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::CoreError;
    use crate::plant::GrowthStage;
    use crate::storage::{MemoryStore, VersionedPlant};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    fn service() -> PlantService<MemoryStore, FixedClock> {
        PlantService::new(
            MemoryStore::new(),
            FixedClock::new(t0()),
            PlantEngine::default(),
            Mcg128Xsl64::seed_from_u64(1),
        )
    }

    #[test]
    fn missing_plant_is_not_found() {
        let svc = service();
        let err = svc.on_entry_added("nobody", t0()).unwrap_err();
        assert!(matches!(err, CoreError::Plant(PlantError::NotFound { .. })));
        let err = svc.on_health_check("nobody", t0()).unwrap_err();
        assert!(matches!(err, CoreError::Plant(PlantError::NotFound { .. })));
        assert!(svc.store().load_plant("nobody").unwrap().is_none());
    }

    #[test]
    fn onboarding_twice_fails() {
        let svc = service();
        svc.onboard("ada").unwrap();
        assert!(matches!(
            svc.onboard("ada").unwrap_err(),
            CoreError::Plant(PlantError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn entries_persist_between_calls() {
        let svc = service();
        svc.onboard("ada").unwrap();
        for n in 0..3 {
            svc.on_entry_added("ada", t0() + Duration::days(n)).unwrap();
        }
        let state = svc.load("ada").unwrap();
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.stage, GrowthStage::Sprout);
        assert_eq!(svc.store().load_plant("ada").unwrap().unwrap().version, 4);
    }

    #[test]
    fn unchanged_check_does_not_write() {
        let svc = service();
        svc.onboard("ada").unwrap();
        svc.on_entry_added("ada", t0()).unwrap();
        let before = svc.store().load_plant("ada").unwrap().unwrap().version;
        let first = svc.on_health_check("ada", t0() + Duration::days(4)).unwrap();
        let second = svc.on_health_check("ada", t0() + Duration::days(4)).unwrap();
        assert_eq!(first, second);
        let after = svc.store().load_plant("ada").unwrap().unwrap().version;
        assert_eq!(after, before + 1);
    }

    #[test]
    fn duplicate_entry_id_applies_once() {
        let svc = service();
        svc.onboard("ada").unwrap();
        let entry = NewEntry {
            entry_id: Some("e-1".into()),
            occurred_at: t0(),
            word_count: 120,
        };
        let first = svc.record_entry("ada", entry.clone()).unwrap();
        let second = svc.record_entry("ada", entry).unwrap();
        assert!(first.applied);
        assert!(!second.applied);
        assert_eq!(second.state.total_entries, 1);
        assert_eq!(svc.entry_stats("ada").unwrap().total_words, 120);
    }

    #[test]
    fn generated_entry_ids_are_unique() {
        let svc = service();
        svc.onboard("ada").unwrap();
        let mk = || NewEntry {
            entry_id: None,
            occurred_at: t0(),
            word_count: 0,
        };
        let a = svc.record_entry("ada", mk()).unwrap();
        let b = svc.record_entry("ada", mk()).unwrap();
        assert_ne!(a.entry_id, b.entry_id);
        assert_eq!(b.state.total_entries, 2);
    }

    #[test]
    fn record_entry_for_unknown_user_records_nothing() {
        let svc = service();
        let entry = NewEntry {
            entry_id: Some("e-1".into()),
            occurred_at: t0(),
            word_count: 0,
        };
        assert!(svc.record_entry("ghost", entry).is_err());
        assert!(svc.store().entries_for("ghost").unwrap().is_empty());
    }

    #[test]
    fn health_check_now_uses_clock() {
        let svc = service();
        svc.onboard("ada").unwrap();
        svc.on_entry_added("ada", t0()).unwrap();
        svc.clock.advance(Duration::days(5));
        let t = svc.health_check_now("ada").unwrap();
        assert_eq!(t.state.health, 76);
        assert!(t.events.iter().any(|e| matches!(e, Event::DecayApplied { .. })));
    }

    #[test]
    fn repair_goes_through_store() {
        let svc = service();
        svc.onboard("ada").unwrap();
        let mut lagging = PlantState::new_seedling();
        lagging.growth_points = 8;
        lagging.current_streak = 3;
        svc.store().compare_and_swap("ada", 1, &lagging).unwrap();

        let t = svc.recalculate_stage("ada").unwrap();
        assert_eq!(t.state.stage, GrowthStage::Plant);
        assert_eq!(svc.load("ada").unwrap().stage, GrowthStage::Plant);
    }

    /// Store wrapper that makes the first N swaps lose, after letting a
    /// "concurrent" writer slip a health check in.
    struct RacingStore {
        inner: MemoryStore,
        losses: AtomicU32,
    }

    impl PlantStore for RacingStore {
        fn load_plant(&self, user_id: &str) -> Result<Option<VersionedPlant>> {
            self.inner.load_plant(user_id)
        }
        fn insert_plant(&self, user_id: &str, state: &PlantState) -> Result<VersionedPlant> {
            self.inner.insert_plant(user_id, state)
        }
        fn compare_and_swap(
            &self,
            user_id: &str,
            expected_version: u64,
            state: &PlantState,
        ) -> Result<Option<u64>> {
            if self.lose_once(user_id)? {
                return Ok(None);
            }
            self.inner.compare_and_swap(user_id, expected_version, state)
        }
        fn commit_entry(
            &self,
            entry: &EntryRecord,
            expected_version: u64,
            state: &PlantState,
        ) -> Result<EntryCommit> {
            if self.lose_once(&entry.user_id)? {
                return Ok(EntryCommit::Conflict);
            }
            self.inner.commit_entry(entry, expected_version, state)
        }
        fn entries_for(&self, user_id: &str) -> Result<Vec<EntryRecord>> {
            self.inner.entries_for(user_id)
        }
    }

    impl RacingStore {
        /// While armed, let a concurrent writer land first and report a loss.
        fn lose_once(&self, user_id: &str) -> Result<bool> {
            if self.losses.load(Ordering::SeqCst) == 0 {
                return Ok(false);
            }
            self.losses.fetch_sub(1, Ordering::SeqCst);
            let current = self.inner.load_plant(user_id)?.expect("plant exists");
            let mut bumped = current.state.clone();
            bumped.health = 40;
            self.inner.compare_and_swap(user_id, current.version, &bumped)?;
            Ok(true)
        }
    }

    fn racing_service(losses: u32) -> PlantService<RacingStore, FixedClock> {
        PlantService::new(
            RacingStore {
                inner: MemoryStore::new(),
                losses: AtomicU32::new(0),
            },
            FixedClock::new(t0()),
            PlantEngine::default(),
            Mcg128Xsl64::seed_from_u64(1),
        )
        .with_max_cas_attempts(3)
        .arm(losses)
    }

    impl PlantService<RacingStore, FixedClock> {
        fn arm(self, losses: u32) -> Self {
            self.store.losses.store(losses, Ordering::SeqCst);
            self
        }
    }

    #[test]
    fn lost_swap_recomputes_from_fresh_state() {
        let svc = racing_service(0);
        svc.onboard("ada").unwrap();
        let svc = svc.arm(1);

        let state = svc.on_entry_added("ada", t0()).unwrap();
        // The boost was computed on top of the concurrent writer's health.
        assert_eq!(state.health, 50);
        assert_eq!(state.total_entries, 1);
    }

    #[test]
    fn persistent_conflict_gives_up() {
        let svc = racing_service(0);
        svc.onboard("ada").unwrap();
        let svc = svc.arm(10);

        let err = svc
            .record_entry(
                "ada",
                NewEntry {
                    entry_id: Some("e-1".into()),
                    occurred_at: t0(),
                    word_count: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Plant(PlantError::Conflict { attempts: 3, .. })
        ));
        // Nothing logged, so a retry can apply it.
        assert!(svc.store().entries_for("ada").unwrap().is_empty());
    }

    #[test]
    fn lost_entry_commit_retries_on_fresh_state() {
        let svc = racing_service(0);
        svc.onboard("ada").unwrap();
        let svc = svc.arm(2);

        let outcome = svc
            .record_entry(
                "ada",
                NewEntry {
                    entry_id: Some("e-1".into()),
                    occurred_at: t0(),
                    word_count: 3,
                },
            )
            .unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.state.health, 50);
        assert_eq!(outcome.state.total_entries, 1);
        assert_eq!(svc.store().entries_for("ada").unwrap().len(), 1);
    }

    /// Store whose first entry commit dies before anything is written.
    struct CrashingStore {
        inner: MemoryStore,
        crashed: AtomicU32,
    }

    impl PlantStore for CrashingStore {
        fn load_plant(&self, user_id: &str) -> Result<Option<VersionedPlant>> {
            self.inner.load_plant(user_id)
        }
        fn insert_plant(&self, user_id: &str, state: &PlantState) -> Result<VersionedPlant> {
            self.inner.insert_plant(user_id, state)
        }
        fn compare_and_swap(
            &self,
            user_id: &str,
            expected_version: u64,
            state: &PlantState,
        ) -> Result<Option<u64>> {
            self.inner.compare_and_swap(user_id, expected_version, state)
        }
        fn commit_entry(
            &self,
            entry: &EntryRecord,
            expected_version: u64,
            state: &PlantState,
        ) -> Result<EntryCommit> {
            if self.crashed.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("process died mid-commit");
            }
            self.inner.commit_entry(entry, expected_version, state)
        }
        fn entries_for(&self, user_id: &str) -> Result<Vec<EntryRecord>> {
            self.inner.entries_for(user_id)
        }
    }

    #[test]
    fn entry_resubmitted_after_crash_applies_once() {
        let svc = PlantService::new(
            CrashingStore {
                inner: MemoryStore::new(),
                crashed: AtomicU32::new(0),
            },
            FixedClock::new(t0()),
            PlantEngine::default(),
            Mcg128Xsl64::seed_from_u64(1),
        );
        svc.onboard("ada").unwrap();
        let entry = NewEntry {
            entry_id: Some("e-1".into()),
            occurred_at: t0(),
            word_count: 0,
        };

        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            svc.record_entry("ada", entry.clone())
        }));
        assert!(crashed.is_err());
        assert!(svc.store().entries_for("ada").unwrap().is_empty());

        let retry = svc.record_entry("ada", entry.clone()).unwrap();
        assert!(retry.applied);
        assert_eq!(retry.state.total_entries, 1);
        assert_eq!(svc.store().entries_for("ada").unwrap().len(), 1);

        let again = svc.record_entry("ada", entry).unwrap();
        assert!(!again.applied);
        assert_eq!(svc.load("ada").unwrap().total_entries, 1);
    }
}
