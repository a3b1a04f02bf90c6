//! Role-change detection engine for the rolewatch roster watcher.
//!
//! This crate contains everything with algorithmic content and nothing
//! with I/O: the transition classifier, the tracked-player store with
//! its aging index, the aggregate need calculator, the single-tick
//! orchestration, and the typed configuration they all share.
//!
//! # Modules
//!
//! - [`config`] -- YAML-backed configuration with defaults
//! - [`needs`] -- per-team "supports wanted" calculator
//! - [`classify`] -- pure transition classification
//! - [`store`] -- tracked-player map plus min-heap aging index
//! - [`tick`] -- one tick: validate, classify, mutate, emit events
//!
//! The watcher loop in `rolewatch-engine` drives [`tick::run_tick`]
//! on a fixed timer and hands the resulting events to the dispatcher
//! in `rolewatch-notify`.

pub mod classify;
pub mod config;
pub mod needs;
pub mod store;
pub mod tick;

pub use classify::{Transition, classify};
pub use config::{ConfigError, WatchConfig};
pub use needs::support_needs;
pub use store::TrackedStore;
pub use tick::{TickReport, run_tick};
