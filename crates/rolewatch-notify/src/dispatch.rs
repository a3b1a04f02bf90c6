//! Bounded-concurrency notification dispatch.
//!
//! One tick hands the dispatcher a batch of transition events.
//! Composition and squad-occupancy checks run synchronously; only the
//! network sends are spawned, one task per player, bounded by a
//! counting semaphore so a match-start wave of role changes cannot
//! overwhelm the messenger or webhook transport. Every task is joined
//! before the call returns, which gives the watcher a clean per-tick
//! backpressure point and a corruption-free shutdown.
//!
//! Dispatch tasks only ever see owned copies of event data; the
//! tracked-player store has exactly one writer and it is not here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rolewatch_core::config::WatchConfig;
use rolewatch_types::{PlayerSnapshot, RoleChangeKind, TransitionEvent};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::alert::{AbandonAlert, AlertSink};
use crate::catalog::MessageCatalog;
use crate::compose::{abandon_is_fresh, compose_message};
use crate::messenger::Messenger;

/// Tally of one tick's dispatch work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// In-game messages delivered.
    pub messages_sent: usize,
    /// Webhook alerts delivered.
    pub alerts_sent: usize,
    /// Deliveries that failed (logged and swallowed).
    pub failures: usize,
}

/// Composes and delivers notifications for classified events.
pub struct Dispatcher {
    messenger: Arc<Messenger>,
    sink: Arc<AlertSink>,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a dispatcher with the given delivery channels and
    /// concurrency bound.
    pub fn new(messenger: Messenger, sink: AlertSink, max_concurrent: usize) -> Self {
        Self {
            messenger: Arc::new(messenger),
            sink: Arc::new(sink),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Dispatch notifications for every event of one tick and wait for
    /// all of them to finish.
    ///
    /// Delivery failures never propagate; they are logged and counted
    /// in the returned [`DispatchReport`].
    pub async fn dispatch_all(
        &self,
        events: &[TransitionEvent],
        roster: &[PlayerSnapshot],
        config: &WatchConfig,
        catalog: &MessageCatalog,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let window = config.watch.interval_window();
        let mut tasks: JoinSet<(usize, usize, usize)> = JoinSet::new();

        for event in events {
            let message = compose_message(
                event,
                roster,
                catalog,
                &config.messages,
                &config.roles,
                window,
                now,
            );

            // Alerting applies only to fresh abandons, and only when a
            // valid destination is configured for this server instance.
            let alert = (event.kind == RoleChangeKind::AbandonedCommand
                && abandon_is_fresh(event, now, window))
            .then(|| {
                config
                    .alerts
                    .destination()
                    .map(|dest| (AbandonAlert::from_event(event), dest.webhook_url.clone()))
            })
            .flatten();

            if message.is_none() && alert.is_none() {
                continue;
            }

            let messenger = Arc::clone(&self.messenger);
            let sink = Arc::clone(&self.sink);
            let semaphore = Arc::clone(&self.semaphore);
            let bot_name = config.messages.bot_name.clone();
            let id = event.id.clone();
            let name = event.name.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    // The semaphore is never closed while dispatching.
                    return (0, 0, 1);
                };

                let mut messages_sent = 0_usize;
                let mut alerts_sent = 0_usize;
                let mut failures = 0_usize;

                if let Some(text) = message {
                    match messenger.send(&id, &text, &bot_name).await {
                        Ok(()) => messages_sent = 1,
                        Err(error) => {
                            failures = failures.saturating_add(1);
                            warn!(player = name, %error, "in-game message delivery failed");
                        }
                    }
                }

                if let Some((payload, destination)) = alert {
                    match sink.send(&payload, &destination, &bot_name).await {
                        Ok(()) => alerts_sent = 1,
                        Err(error) => {
                            failures = failures.saturating_add(1);
                            warn!(player = name, %error, "webhook alert delivery failed");
                        }
                    }
                }

                (messages_sent, alerts_sent, failures)
            });
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((messages_sent, alerts_sent, failures)) => {
                    report.messages_sent = report.messages_sent.saturating_add(messages_sent);
                    report.alerts_sent = report.alerts_sent.saturating_add(alerts_sent);
                    report.failures = report.failures.saturating_add(failures);
                }
                Err(error) => {
                    report.failures = report.failures.saturating_add(1);
                    warn!(%error, "dispatch task panicked or was cancelled");
                }
            }
        }

        debug!(
            messages_sent = report.messages_sent,
            alerts_sent = report.alerts_sent,
            failures = report.failures,
            "tick dispatch complete"
        );
        report
    }
}
