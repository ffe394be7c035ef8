//! End-to-end plant lifecycles through the service and the SQLite store.

use bloomjournal_core::plant::{EffectKind, FruitAward, FruitKind, GLOW_DURATION_MS};
use bloomjournal_core::{
    Database, Event, FixedClock, GrowthStage, NewEntry, PlantEngine, PlantService, PlantState,
    PlantStore, VisualState,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 20, 30, 0).unwrap() + Duration::days(n)
}

fn service(db: Database) -> PlantService<Database, FixedClock> {
    PlantService::new(
        db,
        FixedClock::new(day(0)),
        PlantEngine::default(),
        Mcg128Xsl64::seed_from_u64(2024),
    )
}

fn fresh_user() -> PlantService<Database, FixedClock> {
    let svc = service(Database::open_memory().unwrap());
    svc.onboard("mira").unwrap();
    svc
}

#[test]
fn first_entry_keeps_seed_at_full_health() {
    let svc = fresh_user();
    let state = svc.on_entry_added("mira", day(0)).unwrap();

    assert_eq!(state.growth_points, 1);
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.stage, GrowthStage::Seed);
    assert_eq!(state.health, 100);
    assert!(state.flowers.is_empty());
    assert!(state.fruits.is_empty());
}

#[test]
fn three_consecutive_days_reach_sprout_with_a_flower() {
    let svc = fresh_user();
    for n in 0..3 {
        svc.on_entry_added("mira", day(n)).unwrap();
    }
    let state = svc.load("mira").unwrap();

    assert_eq!(state.current_streak, 3);
    assert_eq!(state.growth_points, 3);
    assert_eq!(state.stage, GrowthStage::Sprout);
    assert_eq!(state.flowers.len(), 1);
    assert_eq!(state.flowers[0].streak_at_award, 3);
}

#[test]
fn five_idle_days_wilt_then_seven_prune() {
    let svc = fresh_user();
    for n in 0..3 {
        svc.on_entry_added("mira", day(n)).unwrap();
    }
    let mut with_fruit = svc.store().load_plant("mira").unwrap().unwrap();
    assert_eq!(with_fruit.state.special_effects.len(), 1);
    with_fruit.state.fruits.push(FruitAward {
        kind: FruitKind::Cherry,
        streak_at_award: 10,
        awarded_at: day(1),
    });
    let fruits = with_fruit.state.fruits.clone();
    svc.store()
        .compare_and_swap("mira", with_fruit.version, &with_fruit.state)
        .unwrap()
        .unwrap();

    let wilted = svc.on_health_check("mira", day(2 + 5)).unwrap();
    assert_eq!(wilted.days_since_last_entry, 5);
    assert_eq!(wilted.health, 76);
    assert_eq!(wilted.current_streak, 0);
    assert_eq!(wilted.longest_streak, 3);
    assert!(wilted.wilting_started);
    assert_eq!(wilted.visual_state(), VisualState::Wilting);
    assert_eq!(wilted.flowers.len(), 1);

    let pruned = svc.on_health_check("mira", day(2 + 7)).unwrap();
    assert_eq!(pruned.health, 60);
    assert!(pruned.flowers.is_empty());
    assert!(pruned.special_effects.is_empty());
    assert_eq!(pruned.fruits, fruits);

    // Repeating the same check changes nothing.
    assert_eq!(svc.on_health_check("mira", day(2 + 7)).unwrap(), pruned);

    let later = svc.on_health_check("mira", day(2 + 8)).unwrap();
    assert_eq!(later.fruits, fruits);
}

#[test]
fn plant_to_blooming_emits_glow() {
    let svc = fresh_user();
    let mut primed = PlantState::new_seedling();
    primed.stage = GrowthStage::Plant;
    primed.growth_points = 14;
    primed.total_entries = 14;
    primed.current_streak = 4;
    primed.longest_streak = 4;
    primed.last_entry_at = Some(day(-1));
    assert!(svc.store().compare_and_swap("mira", 1, &primed).unwrap().is_some());

    let state = svc.on_entry_added("mira", day(0)).unwrap();

    assert_eq!(state.current_streak, 5);
    assert_eq!(state.growth_points, 15);
    assert_eq!(state.stage, GrowthStage::Blooming);
    let glow = state.special_effects.last().unwrap();
    assert_eq!(glow.kind, EffectKind::Glow);
    assert_eq!(glow.duration_ms, GLOW_DURATION_MS);
    assert_eq!(glow.duration_ms, 3000);
    assert!(state.flowers.is_empty());
}

#[test]
fn writing_again_after_neglect_restarts_the_streak() {
    let svc = fresh_user();
    for n in 0..4 {
        svc.on_entry_added("mira", day(n)).unwrap();
    }
    svc.on_health_check("mira", day(3 + 6)).unwrap();

    let outcome = svc
        .record_entry(
            "mira",
            NewEntry {
                entry_id: Some("back-again".into()),
                occurred_at: day(3 + 6),
                word_count: 250,
            },
        )
        .unwrap();

    let state = outcome.state;
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.longest_streak, 4);
    assert_eq!(state.health, 78);
    assert!(!state.wilting_started);
    assert_eq!(state.days_since_last_entry, 0);
    assert!(outcome.events.iter().any(|e| matches!(
        e,
        Event::StreakChanged { from: 0, to: 1, .. }
    )));
}

#[test]
fn same_day_entries_only_add_points() {
    let svc = fresh_user();
    for hour in 0..3 {
        svc.on_entry_added("mira", day(0) + Duration::minutes(hour * 20))
            .unwrap();
    }
    let state = svc.load("mira").unwrap();
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.growth_points, 3);
    assert_eq!(state.total_entries, 3);
}

#[test]
fn state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plants.db");

    {
        let svc = service(Database::open_at(&path).unwrap());
        svc.onboard("mira").unwrap();
        for n in 0..3 {
            svc.record_entry(
                "mira",
                NewEntry {
                    entry_id: Some(format!("e-{n}")),
                    occurred_at: day(n),
                    word_count: 100,
                },
            )
            .unwrap();
        }
    }

    let svc = service(Database::open_at(&path).unwrap());
    let view = svc.view("mira").unwrap();
    assert_eq!(view.state.stage, GrowthStage::Sprout);
    assert_eq!(view.stage_name, "Sprout");

    let stats = svc.entry_stats("mira").unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.total_words, 300);
    assert_eq!(stats.active_days, 3);
}

#[test]
fn concurrent_entries_are_all_counted() {
    use std::sync::Arc;

    let svc = Arc::new(
        PlantService::new(
            Database::open_memory().unwrap(),
            FixedClock::new(day(0)),
            PlantEngine::default(),
            Mcg128Xsl64::seed_from_u64(9),
        )
        .with_max_cas_attempts(1_000),
    );
    svc.onboard("mira").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let svc = Arc::clone(&svc);
            std::thread::spawn(move || {
                for i in 0..10 {
                    svc.record_entry(
                        "mira",
                        NewEntry {
                            entry_id: Some(format!("t{t}-{i}")),
                            occurred_at: day(0),
                            word_count: 1,
                        },
                    )
                    .unwrap();
                    svc.on_health_check("mira", day(0)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state = svc.load("mira").unwrap();
    assert_eq!(state.total_entries, 40);
    assert_eq!(state.growth_points, 40);
    assert_eq!(svc.entry_stats("mira").unwrap().total_entries, 40);
}
