//! Multi-tick engine flow: snapshots in, events and store state out.
//!
//! Drives `run_tick` across consecutive rosters the way the watcher
//! loop does, checking the end-to-end properties: arrivals stay quiet,
//! no-op ticks are idempotent, abandons accumulate, and aging evicts.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rolewatch_core::config::WatchConfig;
use rolewatch_core::store::TrackedStore;
use rolewatch_core::tick::run_tick;
use rolewatch_types::{PlayerId, RawPlayer, RoleChangeKind, RosterSnapshot};

fn raw(id: &str, team: &str, squad: Option<&str>, role: &str, level: u32) -> RawPlayer {
    RawPlayer {
        player_id: Some(id.to_owned()),
        name: Some(format!("name-{id}")),
        level: Some(level),
        team: serde_json::from_str(&format!("\"{team}\"")).ok(),
        unit_name: squad.map(ToOwned::to_owned),
        role: Some(role.to_owned()),
    }
}

fn roster(players: Vec<RawPlayer>) -> RosterSnapshot {
    RosterSnapshot {
        players,
        match_label: None,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().unwrap()
}

#[test]
fn repeated_abandons_accumulate_per_window() {
    let mut store = TrackedStore::new();
    let config = WatchConfig::default();

    // Tick 1: arrival as squad leader.
    run_tick(
        &mut store,
        &roster(vec![raw("p1", "allies", Some("able"), "officer", 20)]),
        &config,
        t0(),
    );

    // Tick 2: abandons able for baker (still an officer, lateral move).
    let tick2 = t0() + Duration::seconds(60);
    let report = run_tick(
        &mut store,
        &roster(vec![raw("p1", "allies", Some("baker"), "officer", 20)]),
        &config,
        tick2,
    );
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].kind, RoleChangeKind::AbandonedCommand);
    assert_eq!(report.events[0].abandons, 1);

    // Tick 3: abandons again, this time dropping the role.
    let tick3 = t0() + Duration::seconds(120);
    let report = run_tick(
        &mut store,
        &roster(vec![raw("p1", "allies", Some("baker"), "rifleman", 20)]),
        &config,
        tick3,
    );
    assert_eq!(report.events[0].abandons, 2);
    assert_eq!(report.events[0].last_abandon, Some(tick3));

    let tracked = store.get(&PlayerId::from("p1")).unwrap();
    assert_eq!(tracked.abandons, 2);
    assert_eq!(tracked.role, "rifleman");
}

#[test]
fn quiet_roster_is_fully_idempotent() {
    let mut store = TrackedStore::new();
    let config = WatchConfig::default();
    let players = vec![
        raw("p1", "allies", Some("able"), "officer", 20),
        raw("p2", "allies", Some("able"), "support", 35),
        raw("p3", "axis", Some("dog"), "medic", 12),
    ];

    run_tick(&mut store, &roster(players.clone()), &config, t0());
    let before: Vec<_> = ["p1", "p2", "p3"]
        .iter()
        .map(|id| store.get(&PlayerId::from(*id)).cloned().unwrap())
        .collect();

    for minutes in 1..=5 {
        let report = run_tick(
            &mut store,
            &roster(players.clone()),
            &config,
            t0() + Duration::minutes(minutes),
        );
        assert!(report.events.is_empty());
        assert_eq!(report.unchanged, 3);
    }

    let after: Vec<_> = ["p1", "p2", "p3"]
        .iter()
        .map(|id| store.get(&PlayerId::from(*id)).cloned().unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn level_progress_never_delays_eviction() {
    let mut store = TrackedStore::new();
    let config = WatchConfig::default();

    run_tick(
        &mut store,
        &roster(vec![raw("p1", "allies", Some("able"), "rifleman", 10)]),
        &config,
        t0(),
    );

    // The player keeps levelling up every tick but never changes
    // assignment; the staleness clock keeps running regardless.
    for (i, minutes) in (1..=59).enumerate() {
        let level = 11 + u32::try_from(i).unwrap();
        run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "rifleman", level)]),
            &config,
            t0() + Duration::minutes(minutes),
        );
    }
    assert_eq!(store.get(&PlayerId::from("p1")).unwrap().last_change, t0());

    // Past the 60-minute window the entry ages out even though the
    // player is still on the server, then re-arrives fresh.
    let late = t0() + Duration::minutes(61);
    let report = run_tick(
        &mut store,
        &roster(vec![raw("p1", "allies", Some("able"), "rifleman", 70)]),
        &config,
        late,
    );
    assert_eq!(report.evicted_stale, vec![PlayerId::from("p1")]);
    assert_eq!(report.arrivals, 1);
    assert_eq!(store.get(&PlayerId::from("p1")).unwrap().last_change, late);
}

#[test]
fn team_swap_is_charged_for_officers_only() {
    let mut store = TrackedStore::new();
    let config = WatchConfig::default();

    run_tick(
        &mut store,
        &roster(vec![
            raw("officer", "allies", Some("able"), "officer", 20),
            raw("grunt", "allies", Some("able"), "rifleman", 20),
        ]),
        &config,
        t0(),
    );

    let report = run_tick(
        &mut store,
        &roster(vec![
            raw("officer", "axis", Some("dog"), "officer", 20),
            raw("grunt", "axis", Some("dog"), "rifleman", 20),
        ]),
        &config,
        t0() + Duration::seconds(60),
    );

    assert_eq!(report.events.len(), 2);
    let by_id = |id: &str| {
        report
            .events
            .iter()
            .find(|e| e.id == PlayerId::from(id))
            .unwrap()
    };
    assert_eq!(by_id("officer").kind, RoleChangeKind::AbandonedCommand);
    assert_eq!(by_id("grunt").kind, RoleChangeKind::OrdinaryChange);
}
