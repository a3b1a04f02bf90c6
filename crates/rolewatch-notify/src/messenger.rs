//! In-game messenger: deliver a composed text to one player.
//!
//! Uses enum dispatch instead of trait objects because async methods
//! are not dyn-compatible in Rust. The HTTP variant talks to the RCON
//! HTTP API's `message_player` endpoint; the memory variant records
//! sends for tests and dry runs.

use std::sync::{Arc, Mutex};

use rolewatch_types::PlayerId;

use crate::error::NotifyError;

/// A channel that can deliver an in-game message to a player.
pub enum Messenger {
    /// Deliver through the RCON HTTP API.
    Http(HttpMessenger),
    /// Record deliveries in memory (tests, dry runs).
    Memory(MemoryMessenger),
}

impl Messenger {
    /// Send `message` to the player, attributed to `by`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the transport fails; the caller
    /// logs and swallows it.
    pub async fn send(&self, id: &PlayerId, message: &str, by: &str) -> Result<(), NotifyError> {
        match self {
            Self::Http(messenger) => messenger.send(id, message, by).await,
            Self::Memory(messenger) => messenger.send(id, message, by),
        }
    }
}

/// Messenger backed by the RCON HTTP API.
pub struct HttpMessenger {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMessenger {
    /// Create a messenger for the given API base URL and bearer token.
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    /// POST `message_player` for one recipient.
    async fn send(&self, id: &PlayerId, message: &str, by: &str) -> Result<(), NotifyError> {
        let url = format!("{}/api/message_player", self.api_url);
        let body = serde_json::json!({
            "player_id": id.as_str(),
            "message": message,
            "by": by,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("message_player request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// One message recorded by the memory messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipient identity.
    pub id: PlayerId,
    /// Message body.
    pub message: String,
    /// Sender label.
    pub by: String,
}

/// Messenger that records sends instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessenger {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail: bool,
}

impl MemoryMessenger {
    /// Create a recording messenger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a messenger whose every send fails, for testing the
    /// failure-swallowing path.
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// Messages recorded so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn send(&self, id: &PlayerId, message: &str, by: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery("memory messenger set to fail".to_owned()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                id: id.clone(),
                message: message.to_owned(),
                by: by.to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_messenger_records_sends() {
        let memory = MemoryMessenger::new();
        let messenger = Messenger::Memory(memory.clone());
        messenger
            .send(&PlayerId::from("p1"), "hello", "rolewatch")
            .await
            .unwrap();
        let sent = memory.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message, "hello");
        assert_eq!(sent[0].by, "rolewatch");
    }

    #[tokio::test]
    async fn failing_messenger_returns_delivery_error() {
        let messenger = Messenger::Memory(MemoryMessenger::failing());
        let result = messenger.send(&PlayerId::from("p1"), "hello", "bot").await;
        assert!(matches!(result, Err(NotifyError::Delivery(_))));
    }
}
