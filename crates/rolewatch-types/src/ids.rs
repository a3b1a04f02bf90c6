//! Type-safe wrapper for game-assigned player identities.
//!
//! Player identities come from the game server (platform account IDs),
//! so they are opaque strings rather than locally generated values. The
//! newtype keeps them from being mixed up with display names or squad
//! labels at compile time.

use serde::{Deserialize, Serialize};

/// Unique identity of a player, as assigned by the game platform.
///
/// The inner string is opaque: the watcher never parses it, only
/// compares and forwards it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Borrow the inner identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}
