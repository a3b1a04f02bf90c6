//! Single-tick engine: one roster snapshot in, transition events out.
//!
//! `run_tick` owns the read-then-write boundary per player: it reads
//! the tracked state, classifies the transition, applies the store
//! mutation, and only then surfaces a [`TransitionEvent`]. It performs
//! no I/O; fetching the roster and dispatching notifications belong to
//! the watcher loop.
//!
//! Order within a tick:
//!
//! 1. evict stale entries (aging index)
//! 2. validate raw records (skip malformed with a warning)
//! 3. optionally evict identities absent from the live roster
//! 4. compute aggregate support needs
//! 5. classify each player and apply the corresponding mutation

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rolewatch_types::{
    Assignment, PlayerId, PlayerSnapshot, RoleChangeKind, RosterSnapshot, SupportNeeds,
    TransitionEvent,
};
use tracing::{debug, info, warn};

use crate::classify::{self, Transition};
use crate::config::WatchConfig;
use crate::needs;
use crate::store::TrackedStore;

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Aggregate support-need flags computed for this tick.
    pub needs: SupportNeeds,
    /// Role changes detected this tick, in roster order.
    pub events: Vec<TransitionEvent>,
    /// The validated roster this tick ran against, kept for the
    /// dispatcher's squad-occupancy lookups.
    pub players: Vec<PlayerSnapshot>,
    /// Identities observed for the first time.
    pub arrivals: usize,
    /// Level-only updates.
    pub level_ups: usize,
    /// Players with nothing to report.
    pub unchanged: usize,
    /// Records skipped for missing required fields.
    pub malformed: usize,
    /// Identities evicted for exceeding the staleness window.
    pub evicted_stale: Vec<PlayerId>,
    /// Identities evicted for leaving the server.
    pub evicted_departed: Vec<PlayerId>,
}

/// Run one tick of the detection engine against a fetched roster.
///
/// Mutates `store` only; never performs I/O. Store mutations for a
/// player complete before that player's event is surfaced, so dispatch
/// always sees post-mutation counts.
pub fn run_tick(
    store: &mut TrackedStore,
    roster: &RosterSnapshot,
    config: &WatchConfig,
    now: DateTime<Utc>,
) -> TickReport {
    let mut report = TickReport::default();

    // 1. Age out entries that have gone unchanged too long.
    report.evicted_stale = store.evict_stale(now, config.watch.stale_after());
    for id in &report.evicted_stale {
        debug!(player_id = %id, "tracked player aged out");
    }

    // 2. One explicit validation pass over the wire records.
    let mut players: Vec<PlayerSnapshot> = Vec::with_capacity(roster.players.len());
    for raw in &roster.players {
        match raw.validate() {
            Ok(snapshot) => players.push(snapshot),
            Err(error) => {
                report.malformed = report.malformed.saturating_add(1);
                warn!(
                    name = raw.name.as_deref().unwrap_or("(unknown)"),
                    %error,
                    "skipping malformed roster record"
                );
            }
        }
    }

    // 3. Optional stricter policy: drop identities that left the server.
    if config.watch.evict_departed {
        let present: HashSet<PlayerId> = roster
            .players
            .iter()
            .filter_map(|raw| raw.player_id.as_deref())
            .map(PlayerId::from)
            .collect();
        report.evicted_departed = store.evict_departed(&present);
        for id in &report.evicted_departed {
            debug!(player_id = %id, "departed player dropped");
        }
    }

    // 4. Aggregate needs are computed once per tick, from the full roster.
    report.needs = needs::support_needs(&players, &config.roles);

    // 5. Classify every player, mutate, and collect events.
    for current in &players {
        let previous = store.get(&current.id);

        let prev_squad_others = previous.map_or(0, |prev| {
            classify::squad_occupancy_excluding(
                &players,
                &current.id,
                prev.team,
                prev.squad.as_deref(),
            )
        });

        match classify::classify(
            previous,
            current,
            &config.roles,
            &config.policy,
            prev_squad_others,
        ) {
            Transition::Arrival => {
                store.insert_new(current, now);
                report.arrivals = report.arrivals.saturating_add(1);
                info!(
                    name = current.name,
                    level = current.level,
                    team = %current.team,
                    squad = current.squad.as_deref().unwrap_or("-"),
                    role = current.role,
                    "tracking new player"
                );
            }
            Transition::LevelUp { level } => {
                store.record_level(&current.id, level);
                report.level_ups = report.level_ups.saturating_add(1);
            }
            Transition::Unchanged => {
                report.unchanged = report.unchanged.saturating_add(1);
            }
            Transition::RoleChange { kind } => {
                let Some(prev) = store.get(&current.id) else {
                    continue;
                };
                let previous_assignment = Assignment {
                    team: prev.team,
                    squad: prev.squad.clone(),
                    role: prev.role.clone(),
                };

                let abandoned = kind == RoleChangeKind::AbandonedCommand;
                let Some((abandons, last_abandon)) =
                    store.record_change(&current.id, current, now, abandoned)
                else {
                    continue;
                };

                let event = TransitionEvent {
                    id: current.id.clone(),
                    name: current.name.clone(),
                    level: current.level,
                    previous: previous_assignment,
                    current: Assignment {
                        team: current.team,
                        squad: current.squad.clone(),
                        role: current.role.clone(),
                    },
                    kind,
                    abandons,
                    last_abandon,
                    needs: report.needs,
                };

                info!(
                    name = event.name,
                    level = event.level,
                    from = event.previous.describe(),
                    to = event.current.describe(),
                    kind = ?event.kind,
                    abandons = event.abandons,
                    "role change detected"
                );
                report.events.push(event);
            }
        }
    }

    report.players = players;
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rolewatch_types::{RawPlayer, Team};

    use super::*;

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
        Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).single().unwrap()
    }

    #[test]
    fn first_observation_is_arrival_without_event() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();
        let report = run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "officer", 10)]),
            &config,
            t0(),
        );
        assert_eq!(report.arrivals, 1);
        assert!(report.events.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn noop_tick_leaves_timestamp_untouched() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();
        let entry = vec![raw("p1", "allies", Some("able"), "rifleman", 10)];

        run_tick(&mut store, &roster(entry.clone()), &config, t0());
        let report = run_tick(
            &mut store,
            &roster(entry),
            &config,
            t0() + Duration::seconds(60),
        );
        assert_eq!(report.unchanged, 1);
        let player = store.get(&PlayerId::from("p1")).unwrap();
        assert_eq!(player.last_change, t0());
    }

    #[test]
    fn officer_demotion_yields_abandon_event_with_count() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();

        run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "officer", 10)]),
            &config,
            t0(),
        );
        let later = t0() + Duration::seconds(60);
        let report = run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "rifleman", 10)]),
            &config,
            later,
        );

        assert_eq!(report.events.len(), 1);
        let event = &report.events[0];
        assert_eq!(event.kind, RoleChangeKind::AbandonedCommand);
        assert_eq!(event.abandons, 1);
        assert_eq!(event.last_abandon, Some(later));
        assert_eq!(event.previous.role, "officer");
        assert_eq!(event.current.role, "rifleman");
        assert_eq!(store.get(&event.id).unwrap().abandons, 1);
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();
        let mut broken = raw("p2", "allies", None, "rifleman", 5);
        broken.level = None;

        let report = run_tick(
            &mut store,
            &roster(vec![raw("p1", "axis", Some("baker"), "medic", 30), broken]),
            &config,
            t0(),
        );
        assert_eq!(report.malformed, 1);
        assert_eq!(report.arrivals, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn departed_eviction_runs_when_enabled() {
        let mut store = TrackedStore::new();
        let mut config = WatchConfig::default();
        config.watch.evict_departed = true;

        run_tick(
            &mut store,
            &roster(vec![
                raw("stay", "allies", Some("able"), "rifleman", 10),
                raw("leave", "allies", Some("able"), "rifleman", 10),
            ]),
            &config,
            t0(),
        );
        let report = run_tick(
            &mut store,
            &roster(vec![raw("stay", "allies", Some("able"), "rifleman", 10)]),
            &config,
            t0() + Duration::seconds(60),
        );
        assert_eq!(report.evicted_departed, vec![PlayerId::from("leave")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn needs_flags_ride_along_on_events() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();

        // Two allied squad leaders, no supports: allies need one.
        let mut players = vec![
            raw("sl1", "allies", Some("able"), "officer", 10),
            raw("sl2", "allies", Some("baker"), "officer", 10),
            raw("mover", "allies", Some("able"), "rifleman", 10),
        ];
        run_tick(&mut store, &roster(players.clone()), &config, t0());

        players[2] = raw("mover", "allies", Some("able"), "assault", 10);
        let report = run_tick(
            &mut store,
            &roster(players),
            &config,
            t0() + Duration::seconds(60),
        );
        assert!(report.needs.allies);
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].needs.allies);
        assert_eq!(report.events[0].kind, RoleChangeKind::OrdinaryChange);
    }

    #[test]
    fn stale_entries_are_evicted_before_classification() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();

        run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "officer", 10)]),
            &config,
            t0(),
        );

        // Two hours later (window is 60 minutes) the entry is gone, so
        // the same player re-arrives instead of producing a change.
        let much_later = t0() + Duration::hours(2);
        let report = run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "rifleman", 10)]),
            &config,
            much_later,
        );
        assert_eq!(report.evicted_stale, vec![PlayerId::from("p1")]);
        assert_eq!(report.arrivals, 1);
        assert!(report.events.is_empty());
    }

    #[test]
    fn team_squad_and_role_changes_all_count() {
        let mut store = TrackedStore::new();
        let config = WatchConfig::default();

        run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("able"), "officer", 60)]),
            &config,
            t0(),
        );
        // Same role, different squad: still an abandon.
        let report = run_tick(
            &mut store,
            &roster(vec![raw("p1", "allies", Some("baker"), "officer", 60)]),
            &config,
            t0() + Duration::seconds(60),
        );
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].kind, RoleChangeKind::AbandonedCommand);
        assert_eq!(store.get(&PlayerId::from("p1")).unwrap().team, Team::Allies);
    }
}
