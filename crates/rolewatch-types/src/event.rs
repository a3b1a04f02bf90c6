//! Transition events and aggregate need flags.
//!
//! A [`TransitionEvent`] is produced once per detected team/squad/role
//! change and carries everything the notification dispatcher needs, so
//! dispatch tasks never read the tracked-player store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::PlayerId;
use crate::player::Team;

/// How a role change is tagged after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChangeKind {
    /// The player held an officer role and moved away from it.
    AbandonedCommand,
    /// A reassignment with no officer post involved.
    OrdinaryChange,
}

/// Per-team "more supports wanted" flags for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupportNeeds {
    /// Allies are short on support players.
    pub allies: bool,
    /// Axis are short on support players.
    pub axis: bool,
}

impl SupportNeeds {
    /// Whether the given team currently needs supports.
    ///
    /// Unassigned players belong to no team and are never in need.
    pub const fn for_team(self, team: Team) -> bool {
        match team {
            Team::Allies => self.allies,
            Team::Axis => self.axis,
            Team::Unassigned => false,
        }
    }
}

/// A player's previous or current assignment, as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Team at that point in time.
    pub team: Team,
    /// Squad at that point in time.
    pub squad: Option<String>,
    /// Role at that point in time.
    pub role: String,
}

impl Assignment {
    /// Render as `team/squad/role` for logs and alerts.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}/{}",
            self.team,
            self.squad.as_deref().unwrap_or("-"),
            self.role
        )
    }
}

/// A classified team/squad/role change for a single player.
///
/// Ephemeral: built by the tick orchestrator after the store mutation
/// completed, consumed by the dispatcher, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    /// Platform-assigned identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Current level.
    pub level: u32,
    /// Assignment before the change.
    pub previous: Assignment,
    /// Assignment after the change.
    pub current: Assignment,
    /// How the change was classified.
    pub kind: RoleChangeKind,
    /// Cumulative abandon count after this change was applied.
    pub abandons: u32,
    /// Timestamp of the most recent abandon, if any.
    pub last_abandon: Option<DateTime<Utc>>,
    /// Aggregate support-need flags for the tick this event came from.
    pub needs: SupportNeeds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_lookup_respects_team() {
        let needs = SupportNeeds {
            allies: true,
            axis: false,
        };
        assert!(needs.for_team(Team::Allies));
        assert!(!needs.for_team(Team::Axis));
        assert!(!needs.for_team(Team::Unassigned));
    }

    #[test]
    fn assignment_describe_uses_dash_for_no_squad() {
        let assignment = Assignment {
            team: Team::Axis,
            squad: None,
            role: "armycommander".to_owned(),
        };
        assert_eq!(assignment.describe(), "axis/-/armycommander");
    }
}
