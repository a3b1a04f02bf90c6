//! Error types for the watcher binary.
//!
//! The only fatal errors live in startup (bad configuration). Once the
//! poll loop runs, every error is recovered per tick: a fetch failure
//! skips the tick, a malformed record skips the player, a delivery
//! failure is swallowed inside the dispatcher.

/// Errors that can occur in the watcher binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be loaded or validated.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: rolewatch_core::ConfigError,
    },

    /// The roster could not be fetched this tick (transient).
    #[error("roster fetch failed: {message}")]
    Fetch {
        /// Description of the transport or API failure.
        message: String,
    },

    /// The roster API answered with an envelope the engine cannot use.
    #[error("roster API returned unusable payload: {message}")]
    Payload {
        /// What was wrong with the payload.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert_and_keep_the_reason() {
        let source = rolewatch_core::ConfigError::Invalid {
            reason: "watch.interval_seconds must be at least 1".to_owned(),
        };
        let error = EngineError::from(source);
        assert!(matches!(error, EngineError::Config { .. }));
        assert!(error.to_string().contains("interval_seconds"));
    }
}
