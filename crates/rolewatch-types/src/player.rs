//! Roster records: raw wire form, validated snapshot, tracked state.
//!
//! The roster API returns loosely shaped JSON where any field can be
//! absent or null. [`RawPlayer`] mirrors that wire shape; a single
//! explicit [`RawPlayer::validate`] step turns it into a
//! [`PlayerSnapshot`] or a [`MalformedRecord`] error, so the rest of
//! the engine never has to reach for per-field fallbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Team assignment of a player.
///
/// Unknown team strings from the wire fold into [`Team::Unassigned`];
/// the aggregate need calculator simply does not count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// The allied faction.
    Allies,
    /// The axis faction.
    Axis,
    /// No team yet (lobby, spectating) or an unrecognized value.
    #[serde(other)]
    Unassigned,
}

impl core::fmt::Display for Team {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Allies => write!(f, "allies"),
            Self::Axis => write!(f, "axis"),
            Self::Unassigned => write!(f, "unassigned"),
        }
    }
}

/// A player record missing a field the engine cannot work without.
///
/// Recovered by skipping the single player for the tick; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("player record missing required field `{field}`")]
pub struct MalformedRecord {
    /// Name of the absent required field.
    pub field: &'static str,
}

/// A player entry exactly as the roster API delivered it.
///
/// Every field is optional because the wire format makes no promises.
/// Null teams mean "not picked yet" and null or empty squad names mean
/// "not in a squad"; those are legitimate states, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayer {
    /// Platform-assigned identity.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Numeric progression level.
    #[serde(default)]
    pub level: Option<u32>,
    /// Team assignment, absent while in the lobby.
    #[serde(default)]
    pub team: Option<Team>,
    /// Squad/unit name, absent when unassigned.
    #[serde(default)]
    pub unit_name: Option<String>,
    /// Role tag from the game's role vocabulary.
    #[serde(default)]
    pub role: Option<String>,
}

impl RawPlayer {
    /// Validate the raw record into a [`PlayerSnapshot`].
    ///
    /// Identity, name, level, and role are required. Team defaults to
    /// [`Team::Unassigned`] and an absent or empty squad name becomes
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRecord`] naming the first missing required
    /// field.
    pub fn validate(&self) -> Result<PlayerSnapshot, MalformedRecord> {
        let id = self
            .player_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(MalformedRecord { field: "player_id" })?;
        let name = self
            .name
            .as_deref()
            .ok_or(MalformedRecord { field: "name" })?;
        let level = self.level.ok_or(MalformedRecord { field: "level" })?;
        let role = self
            .role
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(MalformedRecord { field: "role" })?;

        Ok(PlayerSnapshot {
            id: PlayerId::from(id),
            name: name.to_owned(),
            level,
            team: self.team.unwrap_or(Team::Unassigned),
            squad: self
                .unit_name
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned),
            role: role.to_owned(),
        })
    }
}

/// One full roster fetch, delivered once per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSnapshot {
    /// Raw player entries, validated individually during the tick.
    pub players: Vec<RawPlayer>,
    /// Current map/match label, when the source can provide one.
    ///
    /// A change in this label between ticks marks a match-end boundary.
    /// `None` disables boundary detection for this snapshot.
    pub match_label: Option<String>,
}

/// A validated player state for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Platform-assigned identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Numeric progression level.
    pub level: u32,
    /// Team assignment.
    pub team: Team,
    /// Squad/unit name, `None` when unassigned.
    pub squad: Option<String>,
    /// Role tag.
    pub role: String,
}

/// Last-known state of a player, owned by the tracked-player store.
///
/// Exists iff the identity has been observed since its last eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPlayer {
    /// Platform-assigned identity.
    pub id: PlayerId,
    /// Display name at last observation.
    pub name: String,
    /// Last-known level.
    pub level: u32,
    /// Last-known team.
    pub team: Team,
    /// Last-known squad.
    pub squad: Option<String>,
    /// Last-known role.
    pub role: String,
    /// Number of times this player abandoned an officer post, within
    /// the current tracking window. Monotonic until eviction or a
    /// match-end reset.
    pub abandons: u32,
    /// Timestamp of the last team/squad/role change.
    pub last_change: DateTime<Utc>,
    /// Timestamp of the last abandon event, if any.
    pub last_abandon: Option<DateTime<Utc>>,
}

impl TrackedPlayer {
    /// Create a fresh tracked record from a validated snapshot.
    pub fn from_snapshot(snapshot: &PlayerSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            level: snapshot.level,
            team: snapshot.team,
            squad: snapshot.squad.clone(),
            role: snapshot.role.clone(),
            abandons: 0,
            last_change: now,
            last_abandon: None,
        }
    }
}
