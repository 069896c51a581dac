mod common;

use class_struggle::model::{ClassLabel, ConflictStage, EventKind, Society};
use class_struggle::sim::{SimConfig, default_systems, run};

use common::build_test_society;

fn run_society(seed: u64, num_years: u32) -> Society {
    let (mut society, _) = build_test_society(100);
    let mut systems = default_systems();
    run(&mut society, &mut systems, SimConfig::new(100, num_years, seed)).unwrap();
    society
}

#[test]
fn same_seed_same_history() {
    let a = run_society(42, 15);
    let b = run_society(42, 15);
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.events, b.events);
    assert_eq!(a.classes.conflicts(), b.classes.conflicts());
}

#[test]
fn classes_emerge_in_first_year() {
    let society = run_society(7, 1);
    assert!(society.classes.classes_emerged());
    assert_eq!(society.classes.first_class_year(), Some(100));
    assert_eq!(society.classes.class_size(ClassLabel::Landless), 15);
    assert_eq!(society.classes.class_size(ClassLabel::Landowner), 1);
    assert_eq!(society.classes.class_size(ClassLabel::Craftsman), 1);
    assert_eq!(society.events_of_kind(EventKind::ClassesEmerged).count(), 1);
    assert!(society.inequality > 0.5);
}

#[test]
fn tense_society_fights_and_resolves() {
    for seed in [1, 2, 3] {
        let society = run_society(seed, 10);
        let conflicts = society.classes.conflicts();
        assert!(!conflicts.is_empty(), "seed {seed}: no conflict in ten years");

        let resolved: Vec<_> = conflicts.iter().filter(|c| c.resolved).collect();
        assert!(!resolved.is_empty(), "seed {seed}: no conflict resolved");
        for c in &resolved {
            assert_eq!(c.stage, ConflictStage::Resolved);
            assert!(c.outcome.is_some());
            assert!(c.days_active >= 30);
            assert!(c.production_loss <= 0.5);
        }

        // Only one conflict per class pair is active at any time.
        let active = conflicts.iter().filter(|c| c.is_active()).count();
        assert!(active <= 1);

        let mut ids: Vec<&str> = conflicts.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), conflicts.len());
        assert!(ids.iter().all(|id| id.starts_with("conflict_")));

        assert_eq!(
            society.events_of_kind(EventKind::ConflictStarted).count(),
            conflicts.len()
        );
        assert_eq!(
            society.events_of_kind(EventKind::ConflictResolved).count(),
            resolved.len()
        );
    }
}

#[test]
fn consciousness_spreads_through_the_village() {
    let society = run_society(11, 2);
    let landless = society.classes.class(ClassLabel::Landless).unwrap();
    assert!(landless.class_consciousness > 0.0);
    assert!(society.consciousness.spread_history().count() > 0);
    assert!(society
        .consciousness
        .spread_history()
        .all(|e| e.class_label == ClassLabel::Landless));
}

#[test]
fn reported_crisis_is_felt_on_next_month() {
    let (mut society, _) = build_test_society(100);
    society.report_crisis("famine", 1.0);
    let mut systems = default_systems();
    run(&mut society, &mut systems, SimConfig::new(100, 1, 5)).unwrap();

    let crisis = society.events_of_kind(EventKind::Crisis).next().unwrap();
    assert_eq!(crisis.date.year(), 100);
    assert_eq!(crisis.data["kind"], "famine");
}

#[test]
fn drift_is_reported_then_healed() {
    let (mut society, village) = build_test_society(100);
    let mut systems = default_systems();
    run(&mut society, &mut systems, SimConfig::new(100, 1, 9)).unwrap();
    assert!(society.check_consistency().is_valid());

    // A collaborator forgets to call remove_agent.
    society.agents.remove(&village[5]);
    let report = society.check_consistency();
    assert!(!report.is_valid());
    assert!(report.error_count() >= 1);

    // The next formation pass drops the agent from every index.
    run(&mut society, &mut systems, SimConfig::new(101, 1, 9)).unwrap();
    assert_eq!(society.classes.npc_class(village[5]), None);
    let report = society.check_consistency();
    assert!(report.is_valid(), "{}", report.summary());
    for conflict in society.classes.get_active_conflicts() {
        assert!(!conflict.participants.contains_key(&village[5]));
    }
}

#[test]
fn statistics_serialize() {
    let society = run_society(21, 3);
    let stats = society.statistics();
    assert_eq!(stats.year, 102);
    assert!(stats.classes_emerged);
    assert_eq!(stats.total_conflicts, society.classes.conflicts().len());

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["distribution"]["landless"], 15);
    assert!(json["consciousness"]["landless"]["level"].as_f64().unwrap() > 0.0);
}
