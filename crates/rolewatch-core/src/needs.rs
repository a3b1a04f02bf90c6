//! Aggregate need calculator: does a team want more support players?
//!
//! Pure per-snapshot arithmetic. Only infantry officers (squad
//! leaders) create support demand; commanders, tank commanders, and
//! recon leaders run their own logistics and are not counted.

use rolewatch_types::{PlayerSnapshot, SupportNeeds, Team};

use crate::config::RolePolicy;

/// Officer and support tallies for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TeamCounts {
    officers: u32,
    supports: u32,
}

/// Compute per-team support-need flags from one validated roster.
///
/// A team needs supports iff its current support count is strictly
/// below the requirement for its infantry-officer count. Players with
/// no team are not counted anywhere.
pub fn support_needs(players: &[PlayerSnapshot], policy: &RolePolicy) -> SupportNeeds {
    let mut allies = TeamCounts::default();
    let mut axis = TeamCounts::default();

    for player in players {
        let counts = match player.team {
            Team::Allies => &mut allies,
            Team::Axis => &mut axis,
            Team::Unassigned => continue,
        };
        if player.role == policy.infantry_officer_role {
            counts.officers = counts.officers.saturating_add(1);
        }
        if player.role == policy.support_role {
            counts.supports = counts.supports.saturating_add(1);
        }
    }

    SupportNeeds {
        allies: allies.supports < policy.required_supports_for(allies.officers),
        axis: axis.supports < policy.required_supports_for(axis.officers),
    }
}
