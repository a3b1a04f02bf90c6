//! Tracked-player store: last-known state with age-based eviction.
//!
//! The store is the single source of truth for "previous" state. It is
//! owned and mutated by the tick orchestrator only; dispatch tasks see
//! immutable [`TransitionEvent`] copies and never write back.
//!
//! Eviction is driven by a min-heap aging index keyed by
//! `last_change`, so a quiet tick does not scan the whole map. Index
//! entries are lazy: every mutation pushes a fresh `(last_change, id)`
//! pair and outdated pairs are discarded when they surface at the top.
//! If the index ever runs empty while players remain, it is rebuilt
//! from the map.
//!
//! [`TransitionEvent`]: rolewatch_types::TransitionEvent

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rolewatch_types::{PlayerId, PlayerSnapshot, TrackedPlayer};

/// Role every player is reset to at a match-end boundary.
///
/// Matches the game's default spawn role, so the first post-reset
/// comparison sees the same baseline the server itself starts from.
pub const BASELINE_ROLE: &str = "rifleman";

/// Map of tracked players plus the min-heap aging index.
#[derive(Debug, Default)]
pub struct TrackedStore {
    players: HashMap<PlayerId, TrackedPlayer>,
    aging: BinaryHeap<Reverse<(DateTime<Utc>, PlayerId)>>,
}

impl TrackedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the store holds no identities.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up the last-known state for an identity.
    pub fn get(&self, id: &PlayerId) -> Option<&TrackedPlayer> {
        self.players.get(id)
    }

    /// Track a newly observed identity with a fresh record.
    ///
    /// An existing record for the same identity is replaced, which
    /// also zeroes its counters.
    pub fn insert_new(&mut self, snapshot: &PlayerSnapshot, now: DateTime<Utc>) {
        self.players
            .insert(snapshot.id.clone(), TrackedPlayer::from_snapshot(snapshot, now));
        self.aging.push(Reverse((now, snapshot.id.clone())));
    }

    /// Record a level-only update.
    ///
    /// Does NOT refresh `last_change`: a player who only levels up is
    /// still aging toward eviction.
    pub fn record_level(&mut self, id: &PlayerId, level: u32) {
        if let Some(player) = self.players.get_mut(id) {
            player.level = level;
        }
    }

    /// Apply a team/squad/role change to a tracked player.
    ///
    /// Refreshes `last_change`, copies the new assignment and level,
    /// and when `abandoned` charges one abandon and stamps
    /// `last_abandon`. Returns the resulting abandon count and last
    /// abandon timestamp, or `None` if the identity is not tracked.
    pub fn record_change(
        &mut self,
        id: &PlayerId,
        snapshot: &PlayerSnapshot,
        now: DateTime<Utc>,
        abandoned: bool,
    ) -> Option<(u32, Option<DateTime<Utc>>)> {
        let player = self.players.get_mut(id)?;
        player.team = snapshot.team;
        player.squad = snapshot.squad.clone();
        player.role = snapshot.role.clone();
        player.level = snapshot.level;
        player.last_change = now;
        if abandoned {
            player.abandons = player.abandons.saturating_add(1);
            player.last_abandon = Some(now);
        }
        let result = (player.abandons, player.last_abandon);
        self.aging.push(Reverse((now, id.clone())));
        Some(result)
    }

    /// Remove every entry whose last change is older than
    /// `now - max_age`. Returns the evicted identities.
    pub fn evict_stale(&mut self, now: DateTime<Utc>, max_age: chrono::Duration) -> Vec<PlayerId> {
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            // A window wider than representable time evicts nothing.
            return Vec::new();
        };
        let mut evicted = Vec::new();

        while let Some(Reverse((stamped, _))) = self.aging.peek() {
            if *stamped >= cutoff {
                break;
            }
            let Some(Reverse((_, id))) = self.aging.pop() else {
                break;
            };
            match self.players.get(&id) {
                // The pair matches the live record: the player really
                // is stale.
                Some(player) if player.last_change < cutoff => {
                    self.players.remove(&id);
                    evicted.push(id);
                }
                // Outdated pair; a fresher one is still in the heap.
                Some(_) | None => {}
            }
        }

        // Invariant: every tracked player keeps at least one index
        // pair. Rebuild if the heap drained while players remain.
        if self.aging.is_empty() && !self.players.is_empty() {
            self.rebuild_index();
        }

        evicted
    }

    /// Remove every entry whose identity is absent from the live
    /// roster. Returns the evicted identities.
    pub fn evict_departed(&mut self, present: &HashSet<PlayerId>) -> Vec<PlayerId> {
        let departed: Vec<PlayerId> = self
            .players
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        for id in &departed {
            self.players.remove(id);
        }
        departed
    }

    /// Match-end boundary reset.
    ///
    /// Forces every tracked player back to the unassigned baseline and
    /// zeroes per-match counters, so the first post-boundary tick does
    /// not charge the engine's own reset as abandons.
    pub fn reset_all(&mut self, now: DateTime<Utc>) {
        for player in self.players.values_mut() {
            player.squad = None;
            player.role = BASELINE_ROLE.to_owned();
            player.abandons = 0;
            player.last_abandon = None;
            player.last_change = now;
        }
        self.rebuild_index();
    }

    /// Rebuild the aging index from the live map.
    fn rebuild_index(&mut self) {
        self.aging = self
            .players
            .values()
            .map(|p| Reverse((p.last_change, p.id.clone())))
            .collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rolewatch_types::Team;

    use super::*;

    fn snapshot(id: &str, role: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            id: PlayerId::from(id),
            name: id.to_owned(),
            level: 10,
            team: Team::Allies,
            squad: Some("able".to_owned()),
            role: role.to_owned(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn level_update_does_not_refresh_last_change() {
        let mut store = TrackedStore::new();
        let snap = snapshot("p1", "rifleman");
        store.insert_new(&snap, t0());

        store.record_level(&snap.id, 11);
        let player = store.get(&snap.id).unwrap();
        assert_eq!(player.level, 11);
        assert_eq!(player.last_change, t0());
    }

    #[test]
    fn change_refreshes_timestamp_and_abandon_charges_once() {
        let mut store = TrackedStore::new();
        let snap = snapshot("p1", "officer");
        store.insert_new(&snap, t0());

        let later = t0() + Duration::seconds(60);
        let demoted = snapshot("p1", "rifleman");
        let (abandons, last_abandon) = store
            .record_change(&snap.id, &demoted, later, true)
            .unwrap();
        assert_eq!(abandons, 1);
        assert_eq!(last_abandon, Some(later));

        let player = store.get(&snap.id).unwrap();
        assert_eq!(player.role, "rifleman");
        assert_eq!(player.last_change, later);
        assert_eq!(player.abandons, 1);
    }

    #[test]
    fn ordinary_change_does_not_charge() {
        let mut store = TrackedStore::new();
        let snap = snapshot("p1", "rifleman");
        store.insert_new(&snap, t0());

        let later = t0() + Duration::seconds(60);
        let moved = snapshot("p1", "medic");
        let (abandons, last_abandon) = store
            .record_change(&snap.id, &moved, later, false)
            .unwrap();
        assert_eq!(abandons, 0);
        assert_eq!(last_abandon, None);
    }

    #[test]
    fn evict_stale_respects_the_window() {
        let mut store = TrackedStore::new();
        store.insert_new(&snapshot("old", "rifleman"), t0());
        store.insert_new(
            &snapshot("fresh", "rifleman"),
            t0() + Duration::minutes(50),
        );

        let now = t0() + Duration::minutes(61);
        let evicted = store.evict_stale(now, Duration::minutes(60));
        assert_eq!(evicted, vec![PlayerId::from("old")]);
        assert!(store.get(&PlayerId::from("old")).is_none());
        assert!(store.get(&PlayerId::from("fresh")).is_some());
    }

    #[test]
    fn outdated_index_pairs_do_not_evict_refreshed_players() {
        let mut store = TrackedStore::new();
        let snap = snapshot("p1", "rifleman");
        store.insert_new(&snap, t0());

        // Refresh within the window; the heap still holds the t0 pair.
        let refreshed = t0() + Duration::minutes(55);
        store
            .record_change(&snap.id, &snapshot("p1", "medic"), refreshed, false)
            .unwrap();

        let now = t0() + Duration::minutes(70);
        let evicted = store.evict_stale(now, Duration::minutes(60));
        assert!(evicted.is_empty());
        assert!(store.get(&snap.id).is_some());
    }

    #[test]
    fn repeated_eviction_calls_are_idempotent() {
        let mut store = TrackedStore::new();
        store.insert_new(&snapshot("p1", "rifleman"), t0());
        let now = t0() + Duration::hours(2);
        assert_eq!(store.evict_stale(now, Duration::minutes(60)).len(), 1);
        assert!(store.evict_stale(now, Duration::minutes(60)).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn evict_departed_removes_exactly_the_absent() {
        let mut store = TrackedStore::new();
        store.insert_new(&snapshot("here", "rifleman"), t0());
        store.insert_new(&snapshot("gone", "rifleman"), t0());

        let present: HashSet<PlayerId> = [PlayerId::from("here")].into_iter().collect();
        let evicted = store.evict_departed(&present);
        assert_eq!(evicted, vec![PlayerId::from("gone")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reset_all_zeroes_counters_and_rebuilds_index() {
        let mut store = TrackedStore::new();
        let snap = snapshot("p1", "officer");
        store.insert_new(&snap, t0());
        store
            .record_change(
                &snap.id,
                &snapshot("p1", "rifleman"),
                t0() + Duration::seconds(30),
                true,
            )
            .unwrap();

        let boundary = t0() + Duration::minutes(10);
        store.reset_all(boundary);

        let player = store.get(&snap.id).unwrap();
        assert_eq!(player.role, BASELINE_ROLE);
        assert_eq!(player.squad, None);
        assert_eq!(player.abandons, 0);
        assert_eq!(player.last_abandon, None);
        assert_eq!(player.last_change, boundary);

        // The rebuilt index still drives eviction correctly.
        let much_later = boundary + Duration::hours(2);
        let evicted = store.evict_stale(much_later, Duration::minutes(60));
        assert_eq!(evicted, vec![PlayerId::from("p1")]);
    }
}
