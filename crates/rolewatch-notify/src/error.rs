//! Error types for notification delivery.
//!
//! Delivery errors are deliberately shallow: per the engine's error
//! policy they are logged and swallowed at the dispatch boundary, never
//! retried within a tick and never allowed to abort other players'
//! notifications.

/// Errors that can occur while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The in-game messenger or webhook transport failed.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The remote endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },
}
