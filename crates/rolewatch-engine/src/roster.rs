//! Roster snapshot source: the watcher's only inbound collaborator.
//!
//! Uses enum dispatch instead of trait objects because async methods
//! are not dyn-compatible in Rust. The HTTP variant talks to a
//! CRCON-style RCON HTTP API; the memory variant replays scripted
//! snapshots for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use rolewatch_types::{RawPlayer, RosterSnapshot};
use serde::Deserialize;
use tracing::debug;

use crate::error::EngineError;

/// A source of roster snapshots, polled once per tick.
pub enum RosterSource {
    /// Fetch from the RCON HTTP API.
    Http(HttpRosterSource),
    /// Replay scripted snapshots (tests).
    Memory(MemoryRosterSource),
}

impl RosterSource {
    /// Fetch the current roster.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fetch`] or [`EngineError::Payload`] on
    /// failure; the watcher treats either as "try again next tick".
    pub async fn fetch(&self) -> Result<RosterSnapshot, EngineError> {
        match self {
            Self::Http(source) => source.fetch().await,
            Self::Memory(source) => source.fetch(),
        }
    }
}

/// Envelope every CRCON-style API response arrives in.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    failed: bool,
}

/// Payload of `get_detailed_players`.
#[derive(Debug, Default, Deserialize)]
struct DetailedPlayers {
    #[serde(default)]
    players: HashMap<String, RawPlayer>,
}

/// Roster source backed by the RCON HTTP API.
pub struct HttpRosterSource {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    /// Also poll `get_status` for the current map label, enabling
    /// match-end boundary detection.
    fetch_match_label: bool,
}

impl HttpRosterSource {
    /// Create a source for the given API base URL and bearer token.
    pub fn new(api_url: &str, api_key: &str, fetch_match_label: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            fetch_match_label,
        }
    }

    /// GET `get_detailed_players` (and optionally `get_status`).
    async fn fetch(&self) -> Result<RosterSnapshot, EngineError> {
        let url = format!("{}/api/get_detailed_players", self.api_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| EngineError::Fetch {
                message: format!("get_detailed_players request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Fetch {
                message: format!("get_detailed_players returned {status}"),
            });
        }

        let envelope: ApiEnvelope<DetailedPlayers> =
            response.json().await.map_err(|e| EngineError::Payload {
                message: format!("get_detailed_players response parse failed: {e}"),
            })?;

        if envelope.failed {
            return Err(EngineError::Fetch {
                message: "get_detailed_players reported failure".to_owned(),
            });
        }
        let result = envelope.result.ok_or_else(|| EngineError::Payload {
            message: "get_detailed_players returned no result".to_owned(),
        })?;

        let match_label = if self.fetch_match_label {
            self.current_match_label().await
        } else {
            None
        };

        Ok(RosterSnapshot {
            players: result.players.into_values().collect(),
            match_label,
        })
    }

    /// Extract the current map label from `get_status`.
    ///
    /// A failure here only disables boundary detection for this tick;
    /// it never fails the fetch.
    async fn current_match_label(&self) -> Option<String> {
        let url = format!("{}/api/get_status", self.api_url);
        let response = match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "get_status request failed, no match label this tick");
                return None;
            }
        };
        let envelope: ApiEnvelope<serde_json::Value> = match response.json().await {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!(%error, "get_status parse failed, no match label this tick");
                return None;
            }
        };
        envelope.result.as_ref().and_then(extract_map_label)
    }
}

/// Pull a map label out of a `get_status` result.
///
/// Older API versions return `map` as a plain string; newer ones as an
/// object with `id` and `pretty_name` fields.
fn extract_map_label(result: &serde_json::Value) -> Option<String> {
    let map = result.get("map")?;
    if let Some(label) = map.as_str() {
        return Some(label.to_owned());
    }
    map.get("id")
        .or_else(|| map.get("name"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

/// Scripted roster source for tests.
///
/// Each `fetch` pops the next scripted outcome; an exhausted script
/// behaves like a transient fetch failure.
#[derive(Debug, Clone, Default)]
pub struct MemoryRosterSource {
    script: Arc<Mutex<VecDeque<Result<RosterSnapshot, String>>>>,
}

impl MemoryRosterSource {
    /// Create an empty scripted source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful snapshot.
    pub fn push(&self, snapshot: RosterSnapshot) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(snapshot));
        }
    }

    /// Queue a transient failure.
    pub fn push_failure(&self, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.to_owned()));
        }
    }

    fn fetch(&self) -> Result<RosterSnapshot, EngineError> {
        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(message)) => Err(EngineError::Fetch { message }),
            None => Err(EngineError::Fetch {
                message: "scripted roster source exhausted".to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn map_label_from_string_and_object_forms() {
        let old_form = serde_json::json!({"map": "carentan_warfare"});
        assert_eq!(
            extract_map_label(&old_form),
            Some("carentan_warfare".to_owned())
        );

        let new_form = serde_json::json!({"map": {"id": "carentan", "pretty_name": "Carentan"}});
        assert_eq!(extract_map_label(&new_form), Some("carentan".to_owned()));

        let no_map = serde_json::json!({"player_count": 3});
        assert_eq!(extract_map_label(&no_map), None);
    }

    #[tokio::test]
    async fn memory_source_replays_script_in_order() {
        let source = MemoryRosterSource::new();
        source.push(RosterSnapshot::default());
        source.push_failure("server rebooting");

        let wrapped = RosterSource::Memory(source);
        assert!(wrapped.fetch().await.is_ok());
        assert!(matches!(
            wrapped.fetch().await,
            Err(EngineError::Fetch { .. })
        ));
        // Exhausted script keeps failing transiently.
        assert!(wrapped.fetch().await.is_err());
    }

    #[test]
    fn detailed_players_envelope_parses() {
        let json = r#"{
            "result": {
                "players": {
                    "p1": {"player_id": "p1", "name": "A", "level": 3, "team": "allies",
                           "unit_name": "able", "role": "rifleman"}
                }
            },
            "failed": false
        }"#;
        let envelope: ApiEnvelope<DetailedPlayers> = serde_json::from_str(json).unwrap();
        assert!(!envelope.failed);
        assert_eq!(envelope.result.unwrap().players.len(), 1);
    }
}
