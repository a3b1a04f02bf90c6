//! Notification layer for the rolewatch roster watcher.
//!
//! Takes the transition events produced by `rolewatch-core`, composes
//! the per-player in-game message, and delivers messages and webhook
//! alerts with a bounded number of in-flight sends.
//!
//! # Modules
//!
//! - [`catalog`] -- built-in message texts with deployment overrides
//! - [`compose`] -- pure message composition per event
//! - [`messenger`] -- in-game message delivery (HTTP or in-memory)
//! - [`alert`] -- structured webhook alerts for abandons
//! - [`dispatch`] -- semaphore-bounded dispatch with a per-tick join
//! - [`error`] -- delivery error types

pub mod alert;
pub mod catalog;
pub mod compose;
pub mod dispatch;
pub mod error;
pub mod messenger;

pub use alert::{AbandonAlert, AlertSink, MemoryAlertSink, WebhookSink};
pub use catalog::MessageCatalog;
pub use compose::compose_message;
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::NotifyError;
pub use messenger::{HttpMessenger, MemoryMessenger, Messenger, SentMessage};
