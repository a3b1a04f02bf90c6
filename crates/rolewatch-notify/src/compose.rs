//! Pure composition of the per-player in-game message.
//!
//! Three independent, additive parts in a fixed order: the abandon
//! warning, the support suggestion, and role-specific guidance. An
//! empty composition means nothing is sent at all.

use chrono::{DateTime, Utc};
use rolewatch_core::config::{MessageSettings, RolePolicy};
use rolewatch_types::{PlayerSnapshot, RoleChangeKind, TransitionEvent};

use crate::catalog::{
    MessageCatalog, TAG_NB_SQUADS_ABANDONED, TAG_OFFICER_QUITTER, TAG_SUPPORT_NEEDED,
};

/// Whether the event's abandon happened within the current polling
/// window, i.e. it is this tick's change and not a replayed one.
pub fn abandon_is_fresh(
    event: &TransitionEvent,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> bool {
    event
        .last_abandon
        .is_some_and(|stamp| now.signed_duration_since(stamp) < window)
}

/// Compose the in-game message for one transition event.
///
/// Returns `None` when no part applies; the dispatcher then sends
/// nothing for this player.
pub fn compose_message(
    event: &TransitionEvent,
    roster: &[PlayerSnapshot],
    catalog: &MessageCatalog,
    messages: &MessageSettings,
    roles: &RolePolicy,
    window: chrono::Duration,
    now: DateTime<Utc>,
) -> Option<String> {
    let below_immunity = event.level < messages.immunity_level;
    let mut text = String::new();

    // Part 1: the abandon warning, with the cumulative count.
    if event.kind == RoleChangeKind::AbandonedCommand
        && abandon_is_fresh(event, now, window)
        && (messages.always_warn_bad_officers || below_immunity)
    {
        if let Some(quitter) = catalog.get(TAG_OFFICER_QUITTER) {
            text.push_str(quitter);
        }
        if let Some(label) = catalog.get(TAG_NB_SQUADS_ABANDONED) {
            text.push_str(&format!("{label} : {}\n", event.abandons));
        }
    }

    // Part 2: suggest switching to support when the team is short.
    if roles.support_candidates.contains(&event.current.role)
        && event.needs.for_team(event.current.team)
        && !squad_has_other_support(event, roster, roles)
        && (messages.always_suggest_support || below_immunity)
    {
        if let Some(suggestion) = catalog.get(TAG_SUPPORT_NEEDED) {
            text.push_str(suggestion);
        }
    }

    // Part 3: role guidance for low-level players in a squad.
    if below_immunity && event.current.squad.is_some() {
        if let Some(guidance) = catalog.get(&event.current.role) {
            text.push_str(guidance);
        }
    }

    if text.is_empty() { None } else { Some(text) }
}

/// Whether another occupant of the player's current squad already
/// plays the support role.
fn squad_has_other_support(
    event: &TransitionEvent,
    roster: &[PlayerSnapshot],
    roles: &RolePolicy,
) -> bool {
    let Some(squad) = event.current.squad.as_deref() else {
        return false;
    };
    roster.iter().any(|p| {
        p.id != event.id
            && p.team == event.current.team
            && p.squad.as_deref() == Some(squad)
            && p.role == roles.support_role
    })
}
