//! Configuration loading and typed config structures for the watcher.
//!
//! The canonical configuration lives in `rolewatch.yaml` next to the
//! binary. This module defines strongly-typed structs that mirror the
//! YAML structure and provides a loader that reads and validates the
//! file. Every section and every field has a default, so an empty file
//! is a valid configuration (pointing at a local roster API).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is syntactically valid but unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level watcher configuration.
///
/// Mirrors the structure of `rolewatch.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WatchConfig {
    /// Poll timing and eviction settings.
    #[serde(default)]
    pub watch: WatchSettings,

    /// Role vocabulary and support-requirement policy.
    #[serde(default)]
    pub roles: RolePolicy,

    /// Message gating thresholds and catalog overrides.
    #[serde(default)]
    pub messages: MessageSettings,

    /// Transition-classification policy knobs.
    #[serde(default)]
    pub policy: TransitionPolicy,

    /// Notification dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Roster/messaging API connection.
    #[serde(default)]
    pub rcon: RconSettings,

    /// External webhook alert destinations.
    #[serde(default)]
    pub alerts: AlertSettings,
}

impl WatchConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the API
    /// connection: `RCON_API_URL` and `RCON_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.rcon.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.rcon.apply_env_overrides();
        Ok(config)
    }

    /// Validate cross-field constraints the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the poll interval or the
    /// dispatch concurrency bound is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                reason: "watch.interval_seconds must be at least 1".to_owned(),
            });
        }
        if self.dispatch.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                reason: "dispatch.max_concurrent must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Poll timing and eviction settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Seconds between roster polls.
    pub interval_seconds: u64,
    /// Minutes a tracked player may go unchanged before eviction.
    pub stale_after_minutes: u64,
    /// Also evict identities that vanished from the live roster.
    pub evict_departed: bool,
    /// Reset all tracked state when the match label changes.
    pub reset_on_match_end: bool,
    /// Extra seconds to wait after a match-end reset, letting the
    /// server-side roster settle before comparisons resume.
    pub match_end_grace_seconds: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            stale_after_minutes: 60,
            evict_departed: false,
            reset_on_match_end: true,
            match_end_grace_seconds: 80,
        }
    }
}

/// Floor for the poll interval; anything lower hammers the roster API
/// without producing meaningfully fresher transitions.
pub const MIN_INTERVAL_SECONDS: u64 = 10;

impl WatchSettings {
    /// The configured interval with the floor applied.
    const fn clamped_interval_seconds(&self) -> u64 {
        if self.interval_seconds < MIN_INTERVAL_SECONDS {
            MIN_INTERVAL_SECONDS
        } else {
            self.interval_seconds
        }
    }

    /// The poll interval as a [`Duration`], clamped to
    /// [`MIN_INTERVAL_SECONDS`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.clamped_interval_seconds())
    }

    /// The clamped poll interval as a [`chrono::Duration`]. This is
    /// also the freshness window for abandon warnings: an abandon is
    /// only worth mentioning if it happened since the previous poll.
    pub fn interval_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.clamped_interval_seconds()).unwrap_or(i64::MAX),
        )
    }

    /// The staleness window as a [`chrono::Duration`].
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::try_from(self.stale_after_minutes).unwrap_or(i64::MAX))
    }
}

/// Role vocabulary and support-requirement policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RolePolicy {
    /// Roles that grant team/squad leadership.
    pub officers: BTreeSet<String>,
    /// The squad-leader role counted against the support requirement.
    pub infantry_officer_role: String,
    /// The role that satisfies the support requirement.
    pub support_role: String,
    /// Roles eligible for a "switch to support" suggestion.
    pub support_candidates: BTreeSet<String>,
    /// Required support count per infantry-officer count.
    pub required_supports: BTreeMap<u32, u32>,
    /// Required support count for officer counts beyond the table's
    /// domain. Zero reproduces the historical "unlisted means none
    /// required" behavior; raise it to keep pressure on full teams.
    pub required_supports_fallback: u32,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            officers: ["armycommander", "officer", "tankcommander", "spotter"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            infantry_officer_role: "officer".to_owned(),
            support_role: "support".to_owned(),
            support_candidates: ["rifleman", "assault"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            required_supports: [(0, 0), (1, 1), (2, 1), (3, 2), (4, 2), (5, 3), (6, 3)]
                .into_iter()
                .collect(),
            required_supports_fallback: 0,
        }
    }
}

impl RolePolicy {
    /// Whether the given role grants leadership.
    pub fn is_officer(&self, role: &str) -> bool {
        self.officers.contains(role)
    }

    /// How many supports a team with `officer_count` squad leaders
    /// should field. Counts beyond the configured table use the
    /// explicit fallback.
    pub fn required_supports_for(&self, officer_count: u32) -> u32 {
        self.required_supports
            .get(&officer_count)
            .copied()
            .unwrap_or(self.required_supports_fallback)
    }
}

/// Message gating thresholds and catalog overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    /// Level at or above which guidance messages are suppressed.
    pub immunity_level: u32,
    /// Warn officer-abandoners regardless of level.
    pub always_warn_bad_officers: bool,
    /// Suggest support roles regardless of level.
    pub always_suggest_support: bool,
    /// Sender label attached to in-game messages.
    pub bot_name: String,
    /// Overrides merged over the built-in message catalog, keyed by
    /// role or message tag.
    pub catalog_overrides: BTreeMap<String, String>,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            immunity_level: 50,
            always_warn_bad_officers: false,
            always_suggest_support: false,
            bot_name: "rolewatch".to_owned(),
            catalog_overrides: BTreeMap::new(),
        }
    }
}

/// Transition-classification policy knobs.
///
/// Historical iterations of this watcher disagreed on two edge cases;
/// both are explicit configuration here rather than silent choices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransitionPolicy {
    /// When true, a squad leader whose squad held no other occupant is
    /// not charged with abandoning it.
    pub exempt_solo_squad_leader: bool,
    /// When false, a commander dropping to no squad at all is treated
    /// as an ordinary change instead of an abandon.
    pub charge_unassigned_commander: bool,
    /// The commander role name used by the commander exemption above.
    pub commander_role: String,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            exempt_solo_squad_leader: false,
            charge_unassigned_commander: true,
            commander_role: "armycommander".to_owned(),
        }
    }
}

/// Notification dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Maximum simultaneous in-flight notification sends.
    pub max_concurrent: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { max_concurrent: 8 }
    }
}

/// Roster/messaging API connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RconSettings {
    /// Base URL of the RCON HTTP API (e.g. `http://localhost:8010`).
    pub api_url: String,
    /// Bearer token for the API.
    pub api_key: String,
}

impl Default for RconSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8010".to_owned(),
            api_key: String::new(),
        }
    }
}

impl RconSettings {
    /// Apply environment variable overrides (`RCON_API_URL`,
    /// `RCON_API_KEY`) over the YAML values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RCON_API_URL") {
            self.api_url = url;
        }
        if let Ok(key) = std::env::var("RCON_API_KEY") {
            self.api_key = key;
        }
    }
}

/// One webhook alert destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AlertDestination {
    /// Webhook URL to post abandon alerts to.
    pub webhook_url: String,
    /// Whether alerting is active for this destination.
    pub enabled: bool,
}

/// External webhook alert configuration.
///
/// Destinations are listed per game-server instance; `server_number`
/// (1-based) selects which entry this process uses. A missing,
/// disabled, or empty entry silently suppresses alerting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// 1-based index of this server instance.
    pub server_number: usize,
    /// Per-server alert destinations.
    pub servers: Vec<AlertDestination>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            server_number: 1,
            servers: Vec::new(),
        }
    }
}

impl AlertSettings {
    /// Resolve the destination for this server instance.
    ///
    /// Returns `None` when the index is out of range, the entry is
    /// disabled, or the URL is empty. Suppressed alerting is a valid
    /// deployment state, not an error.
    pub fn destination(&self) -> Option<&AlertDestination> {
        self.servers
            .get(self.server_number.checked_sub(1)?)
            .filter(|dest| dest.enabled && !dest.webhook_url.is_empty())
    }
}
