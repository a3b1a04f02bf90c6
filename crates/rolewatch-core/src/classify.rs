//! Transition classifier: compare last-known state to the live roster.
//!
//! Pure decision logic, evaluated in a fixed order with first match
//! winning:
//!
//! 1. no previous record -> [`Transition::Arrival`]
//! 2. level rose, assignment identical -> [`Transition::LevelUp`]
//! 3. assignment identical -> [`Transition::Unchanged`]
//! 4. anything else -> [`Transition::RoleChange`], tagged
//!    [`RoleChangeKind::AbandonedCommand`] when the previous role was
//!    an officer post (subject to the configured exemptions) and
//!    [`RoleChangeKind::OrdinaryChange`] otherwise.
//!
//! The classifier never mutates the store; the tick orchestrator
//! applies whatever the classification demands.

use rolewatch_types::{PlayerSnapshot, RoleChangeKind, Team, TrackedPlayer};

use crate::config::{RolePolicy, TransitionPolicy};

/// Classification of one player's state between two consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First observation of this identity; track it, say nothing.
    Arrival,
    /// Level rose with no assignment change; update level only.
    LevelUp {
        /// The new level to record.
        level: u32,
    },
    /// Nothing to do.
    Unchanged,
    /// Team, squad, or role differs from the last-known state.
    RoleChange {
        /// Whether the change counts as abandoning an officer post.
        kind: RoleChangeKind,
    },
}

/// Classify a player's current snapshot against their tracked state.
///
/// `prev_squad_others` is the number of other players currently
/// occupying the player's previous team/squad, measured against the
/// live roster; it only matters when the solo-squad-leader exemption
/// is configured.
pub fn classify(
    previous: Option<&TrackedPlayer>,
    current: &PlayerSnapshot,
    roles: &RolePolicy,
    policy: &TransitionPolicy,
    prev_squad_others: usize,
) -> Transition {
    let Some(prev) = previous else {
        return Transition::Arrival;
    };

    let assignment_unchanged =
        prev.team == current.team && prev.squad == current.squad && prev.role == current.role;

    if assignment_unchanged {
        if current.level > prev.level {
            return Transition::LevelUp {
                level: current.level,
            };
        }
        return Transition::Unchanged;
    }

    let kind = if was_abandon(prev, current, roles, policy, prev_squad_others) {
        RoleChangeKind::AbandonedCommand
    } else {
        RoleChangeKind::OrdinaryChange
    };
    Transition::RoleChange { kind }
}

/// Decide whether an assignment change counts as abandoning command.
fn was_abandon(
    prev: &TrackedPlayer,
    current: &PlayerSnapshot,
    roles: &RolePolicy,
    policy: &TransitionPolicy,
    prev_squad_others: usize,
) -> bool {
    if !roles.is_officer(&prev.role) {
        return false;
    }

    // A squad leader with nobody under them left no one behind.
    if policy.exempt_solo_squad_leader && prev.squad.is_some() && prev_squad_others == 0 {
        return false;
    }

    // Optionally excuse a commander who steps down to no squad at all.
    if !policy.charge_unassigned_commander
        && prev.role == policy.commander_role
        && current.squad.is_none()
    {
        return false;
    }

    true
}

/// Count the players in `roster` that share `team`/`squad`, excluding
/// the identity of the player being classified.
///
/// This is the squad-occupancy lookup for the solo-squad-leader
/// exemption: the live roster is the closest available record of who
/// was in the squad the moment the leader left it.
pub fn squad_occupancy_excluding(
    roster: &[PlayerSnapshot],
    exclude: &rolewatch_types::PlayerId,
    team: Team,
    squad: Option<&str>,
) -> usize {
    let Some(squad) = squad else {
        return 0;
    };
    roster
        .iter()
        .filter(|p| p.id != *exclude && p.team == team && p.squad.as_deref() == Some(squad))
        .count()
}
