//! Core traits for docket abstractions.
//!
//! The reminder pipeline only sees these seams, so the engine runs the same
//! against PostgreSQL and against in-memory fakes.

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// REMINDER STORAGE
// =============================================================================

/// Read side of the case store used by the batch scan.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Cases scheduled on `day` that have not been notified yet, restricted
    /// to one owner when `user_id` is set. Cases without an owner are never
    /// returned.
    async fn due_cases(&self, day: NaiveDate, user_id: Option<i64>) -> Result<Vec<DueCase>>;
}

/// Write side of the notification store used by the engine.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Record one reminder for `(case_id, user_id, notify_day)`.
    ///
    /// Implementations must make the whole step atomic: look up the case
    /// (`Error::CaseNotFound` when it is gone), insert the notification with
    /// `schedule_date` one day before the case date, and flag the case as
    /// notified. An existing row for the same key yields
    /// `ReminderRecord::AlreadyExists`; no row is inserted but the case is
    /// still flagged as notified.
    async fn record_reminder(&self, draft: ReminderDraft) -> Result<ReminderRecord>;
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the server-local wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the operating system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
