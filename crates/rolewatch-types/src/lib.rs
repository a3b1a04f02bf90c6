//! Shared type definitions for the rolewatch roster watcher.
//!
//! This crate is the single source of truth for the types that flow
//! between the engine crates: the wire-level roster records, the
//! validated per-tick snapshots, the tracked per-player state, and the
//! transition events handed to the notification dispatcher.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrapper for game-assigned player identities
//! - [`player`] -- Roster records: raw wire form, validated snapshot,
//!   tracked state
//! - [`event`] -- Transition events and aggregate need flags

pub mod event;
pub mod ids;
pub mod player;

// Re-export all public types at crate root for convenience.
pub use event::{Assignment, RoleChangeKind, SupportNeeds, TransitionEvent};
pub use ids::PlayerId;
pub use player::{MalformedRecord, PlayerSnapshot, RawPlayer, RosterSnapshot, Team, TrackedPlayer};
