//! # docket-jobs
//!
//! Reminder scheduling and live delivery for docket.
//!
//! This crate provides:
//! - The presence registry tracking which users hold a live push channel
//! - The reminder engine that records next-day hearing reminders
//! - The hourly scheduler that drives the engine
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docket_core::SystemClock;
//! use docket_jobs::{PresenceRegistry, ReminderEngine, ReminderScheduler, SchedulerConfig};
//!
//! let db = docket_db::Database::connect("postgres://...").await?;
//! let clock = Arc::new(SystemClock);
//! let engine = Arc::new(ReminderEngine::new(
//!     db.cases.clone(),
//!     db.notifications.clone(),
//!     PresenceRegistry::spawn(),
//!     clock.clone(),
//! ));
//!
//! let handle = ReminderScheduler::new(engine, clock, SchedulerConfig::from_env()).start();
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod presence;
pub mod reminder;
pub mod scheduler;

pub use presence::{Channel, Inbox, PresenceRegistry};
pub use reminder::{BatchReport, BatchRun, ReminderEngine, SendOutcome};
pub use scheduler::{until_next_fire, ReminderScheduler, SchedulerConfig, SchedulerHandle};
