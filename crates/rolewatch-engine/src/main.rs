//! Roster watcher binary.
//!
//! A long-running background process that polls the roster of an
//! online multiplayer server, detects team/squad/role transitions per
//! player, and dispatches notifications: an in-game message to the
//! player and, where configured, a webhook alert to the admins.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `rolewatch.yaml`
//! 3. Build the HTTP roster source and delivery channels
//! 4. Install the ctrl-c shutdown signal
//! 5. Run the poll loop until shutdown

mod error;
mod roster;
mod watcher;

use std::path::Path;

use anyhow::Context;
use rolewatch_core::config::WatchConfig;
use rolewatch_notify::alert::{AlertSink, WebhookSink};
use rolewatch_notify::dispatch::Dispatcher;
use rolewatch_notify::messenger::{HttpMessenger, Messenger};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::roster::{HttpRosterSource, RosterSource};
use crate::watcher::Watcher;

/// Default configuration path, overridable via `ROLEWATCH_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "rolewatch.yaml";

/// Application entry point.
///
/// Initializes logging, loads configuration, wires the roster source
/// and notification channels together, then runs the poll loop until
/// a termination signal arrives.
///
/// # Errors
///
/// Returns an error if configuration loading or validation fails; once
/// the loop runs, no tick failure is fatal.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("rolewatch starting");

    // Load configuration.
    let config_path =
        std::env::var("ROLEWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;
    config
        .validate()
        .map_err(crate::error::EngineError::from)
        .context("validating configuration")?;
    info!(
        config_path,
        api_url = config.rcon.api_url,
        interval_seconds = config.watch.interval_seconds,
        immunity_level = config.messages.immunity_level,
        max_concurrent = config.dispatch.max_concurrent,
        alerting = config.alerts.destination().is_some(),
        "configuration loaded"
    );

    // Build the roster source and notification channels.
    let source = RosterSource::Http(HttpRosterSource::new(
        &config.rcon.api_url,
        &config.rcon.api_key,
        config.watch.reset_on_match_end,
    ));
    let messenger = Messenger::Http(HttpMessenger::new(
        &config.rcon.api_url,
        &config.rcon.api_key,
    ));
    let sink = AlertSink::Webhook(WebhookSink::new());
    let dispatcher = Dispatcher::new(messenger, sink, config.dispatch.max_concurrent);

    // Install the shutdown signal.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for ctrl-c");
            return;
        }
        info!("termination signal received");
        shutdown_tx.send(true).ok();
    });

    // Run the poll loop.
    let watcher = Watcher::new(config, source, dispatcher);
    watcher.run(shutdown_rx).await;

    info!("rolewatch stopped");
    Ok(())
}

/// Load the configuration file, falling back to defaults when the file
/// does not exist (a bare deployment pointing at localhost).
fn load_config(path: &str) -> Result<WatchConfig, crate::error::EngineError> {
    let path = Path::new(path);
    if path.exists() {
        Ok(WatchConfig::from_file(path)?)
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        let mut config = WatchConfig::default();
        config.rcon.apply_env_overrides();
        Ok(config)
    }
}
