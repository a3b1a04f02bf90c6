//! The poll loop: fetch, classify, dispatch, sleep, repeat.
//!
//! One timer-driven loop produces one batch of work per tick. The
//! tracked-player store is mutated only here between fetch and
//! dispatch; dispatch tasks receive immutable event copies and the
//! dispatcher joins them all before the tick ends, so shutdown can
//! never leave a half-applied store update behind.
//!
//! Scheduling uses a fixed-rate interval with missed ticks skipped:
//! slow ticks neither drift the schedule nor trigger catch-up bursts.

use chrono::Utc;
use rolewatch_core::config::WatchConfig;
use rolewatch_core::store::TrackedStore;
use rolewatch_core::tick::{TickReport, run_tick};
use rolewatch_notify::catalog::MessageCatalog;
use rolewatch_notify::dispatch::Dispatcher;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::roster::RosterSource;

/// What a single tick asked the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickDisposition {
    /// Proceed to the next scheduled tick.
    Continue,
    /// A match boundary was handled; hold for the grace period first.
    GraceSleep,
}

/// The long-running roster watcher.
pub struct Watcher {
    config: WatchConfig,
    source: RosterSource,
    dispatcher: Dispatcher,
    catalog: MessageCatalog,
    store: TrackedStore,
    last_match_label: Option<String>,
}

impl Watcher {
    /// Assemble a watcher from its collaborators.
    pub fn new(config: WatchConfig, source: RosterSource, dispatcher: Dispatcher) -> Self {
        let catalog = MessageCatalog::with_overrides(&config.messages.catalog_overrides);
        Self {
            config,
            source,
            dispatcher,
            catalog,
            store: TrackedStore::new(),
            last_match_label: None,
        }
    }

    /// Run the poll loop until the shutdown channel flips to `true`.
    ///
    /// No tick failure terminates the loop; fetch errors skip the tick
    /// and delivery errors are swallowed inside the dispatcher.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.watch.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_seconds = self.config.watch.interval_seconds,
            stale_after_minutes = self.config.watch.stale_after_minutes,
            evict_departed = self.config.watch.evict_departed,
            reset_on_match_end = self.config.watch.reset_on_match_end,
            "watcher started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.run_once().await == TickDisposition::GraceSleep {
                        let grace = std::time::Duration::from_secs(
                            self.config.watch.match_end_grace_seconds,
                        );
                        info!(grace_seconds = grace.as_secs(), "holding for post-match grace period");
                        tokio::select! {
                            () = tokio::time::sleep(grace) => {}
                            changed = shutdown.changed() => {
                                if changed.is_err() {
                                    info!(tracked = self.store.len(), "shutdown channel closed, watcher stopping");
                                    break;
                                }
                            }
                        }
                    }
                }
                // A closed channel means the control plane is gone;
                // treat it like a shutdown rather than spinning on a
                // branch that resolves instantly forever.
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!(tracked = self.store.len(), "shutdown channel closed, watcher stopping");
                        break;
                    }
                }
            }

            if *shutdown.borrow() {
                info!(tracked = self.store.len(), "watcher shutting down");
                break;
            }
        }
    }

    /// Execute one tick: fetch, detect boundaries, classify, dispatch.
    async fn run_once(&mut self) -> TickDisposition {
        let now = Utc::now();

        // Fetch failure skips the whole tick: no partial mutation.
        let roster = match self.source.fetch().await {
            Ok(roster) => roster,
            Err(error) => {
                warn!(%error, "roster fetch failed, skipping tick");
                return TickDisposition::Continue;
            }
        };

        // Match-end boundary: reset tracked state and hold, so the
        // server's own roster reset is never charged as abandons.
        if self.config.watch.reset_on_match_end {
            if let Some(label) = roster.match_label.clone() {
                let changed = self
                    .last_match_label
                    .as_ref()
                    .is_some_and(|previous| *previous != label);
                self.last_match_label = Some(label);
                if changed {
                    info!(tracked = self.store.len(), "match boundary detected, resetting tracked state");
                    self.store.reset_all(now);
                    return TickDisposition::GraceSleep;
                }
            }
        }

        let report = run_tick(&mut self.store, &roster, &self.config, now);
        let dispatch = self
            .dispatcher
            .dispatch_all(&report.events, &report.players, &self.config, &self.catalog, now)
            .await;

        log_tick(&report, dispatch.messages_sent, dispatch.alerts_sent, dispatch.failures, self.store.len());
        TickDisposition::Continue
    }
}

/// One structured summary line per tick.
fn log_tick(
    report: &TickReport,
    messages_sent: usize,
    alerts_sent: usize,
    failures: usize,
    tracked: usize,
) {
    info!(
        players = report.players.len(),
        tracked,
        changes = report.events.len(),
        arrivals = report.arrivals,
        level_ups = report.level_ups,
        unchanged = report.unchanged,
        malformed = report.malformed,
        evicted_stale = report.evicted_stale.len(),
        evicted_departed = report.evicted_departed.len(),
        allies_need_support = report.needs.allies,
        axis_need_support = report.needs.axis,
        messages_sent,
        alerts_sent,
        failures,
        "tick complete"
    );
}
