//! External alert sink: structured abandon alerts for admins.
//!
//! The webhook variant posts a Discord-style embed payload to the
//! destination configured for this server instance. Destination
//! resolution (including "alerting disabled here") happens in the
//! dispatcher via [`AlertSettings::destination`]; the sink only
//! delivers.
//!
//! [`AlertSettings::destination`]: rolewatch_core::config::AlertSettings::destination

use std::sync::{Arc, Mutex};

use rolewatch_types::{Assignment, PlayerId, TransitionEvent};
use serde::Serialize;

use crate::error::NotifyError;

/// Structured payload describing one abandon event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonAlert {
    /// Platform-assigned identity.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Current level.
    pub level: u32,
    /// Assignment before the abandon.
    pub previous: Assignment,
    /// Assignment after the abandon.
    pub current: Assignment,
    /// Cumulative abandon count.
    pub abandons: u32,
}

impl AbandonAlert {
    /// Build an alert payload from a transition event.
    pub fn from_event(event: &TransitionEvent) -> Self {
        Self {
            player_id: event.id.clone(),
            name: event.name.clone(),
            level: event.level,
            previous: event.previous.clone(),
            current: event.current.clone(),
            abandons: event.abandons,
        }
    }

    /// Human-readable summary used as the embed description.
    pub fn describe(&self) -> String {
        format!(
            "Squads abandoned : {}\nLevel : {}\n{} -> {}",
            self.abandons,
            self.level,
            self.previous.describe(),
            self.current.describe()
        )
    }
}

/// A sink that can deliver a structured abandon alert.
pub enum AlertSink {
    /// Post a Discord-style embed to a webhook URL.
    Webhook(WebhookSink),
    /// Record alerts in memory (tests, dry runs).
    Memory(MemoryAlertSink),
}

impl AlertSink {
    /// Deliver `alert` to `destination`, attributed to `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the transport fails; the caller
    /// logs and swallows it.
    pub async fn send(
        &self,
        alert: &AbandonAlert,
        destination: &str,
        sender: &str,
    ) -> Result<(), NotifyError> {
        match self {
            Self::Webhook(sink) => sink.send(alert, destination, sender).await,
            Self::Memory(sink) => sink.send(alert, destination),
        }
    }
}

/// Webhook-backed alert sink.
#[derive(Debug, Clone, Default)]
pub struct WebhookSink {
    client: reqwest::Client,
}

impl WebhookSink {
    /// Create a webhook sink with its own HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// POST the embed payload to the webhook URL.
    async fn send(
        &self,
        alert: &AbandonAlert,
        destination: &str,
        sender: &str,
    ) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "username": sender,
            "embeds": [{
                "title": alert.name,
                "description": alert.describe(),
                "color": 0x00ff_ffff,
            }],
        });

        let response = self
            .client
            .post(destination)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("webhook request failed: {e}")))?;

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

/// One alert recorded by the memory sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAlert {
    /// The alert payload.
    pub alert: AbandonAlert,
    /// The destination it was addressed to.
    pub destination: String,
}

/// Alert sink that records deliveries instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertSink {
    sent: Arc<Mutex<Vec<SentAlert>>>,
}

impl MemoryAlertSink {
    /// Create a recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts recorded so far.
    pub fn sent(&self) -> Vec<SentAlert> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn send(&self, alert: &AbandonAlert, destination: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentAlert {
                alert: alert.clone(),
                destination: destination.to_owned(),
            });
        }
        Ok(())
    }
}
