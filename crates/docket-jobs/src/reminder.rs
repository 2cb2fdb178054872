//! Reminder engine: finds cases due tomorrow, records one notification per
//! case per day, and pushes it to the owner when they are online.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use docket_core::{
    calendar, CaseStore, Clock, Notification, NotificationPayload, NotificationStore, PushEvent,
    ReminderDraft, ReminderRecord, Result,
};

use crate::presence::PresenceRegistry;

/// Outcome of a single send-and-save.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// A new notification was stored. `delivered` is true when it was pushed
    /// to a live channel.
    Created {
        notification: Notification,
        delivered: bool,
    },
    /// A reminder for this case and user was already recorded today.
    AlreadyExists,
}

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub scanned: usize,
    pub created: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub delivered: usize,
}

/// Result of asking for a full batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRun {
    Completed(BatchReport),
    /// Another full run was still in flight.
    Skipped,
}

/// Clears the in-flight flag when a full run ends, including on panic.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The notification engine.
pub struct ReminderEngine {
    cases: Arc<dyn CaseStore>,
    notifications: Arc<dyn NotificationStore>,
    presence: PresenceRegistry,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
}

impl ReminderEngine {
    pub fn new(
        cases: Arc<dyn CaseStore>,
        notifications: Arc<dyn NotificationStore>,
        presence: PresenceRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cases,
            notifications,
            presence,
            clock,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Record a reminder for `case_id` and push it to `user_id` if online.
    ///
    /// A second call for the same case and user on the same calendar day
    /// returns [`SendOutcome::AlreadyExists`]. A vanished case fails with
    /// `Error::CaseNotFound`.
    pub async fn send_and_save_notification(
        &self,
        user_id: i64,
        message: String,
        case_id: i64,
    ) -> Result<SendOutcome> {
        let draft = ReminderDraft {
            case_id,
            user_id,
            message,
            notify_day: self.clock.today(),
        };

        match self.notifications.record_reminder(draft).await? {
            ReminderRecord::Created(notification) => {
                let delivered = self.deliver(&notification).await;
                Ok(SendOutcome::Created {
                    notification,
                    delivered,
                })
            }
            ReminderRecord::AlreadyExists => {
                debug!(
                    subsystem = "jobs",
                    component = "reminder_engine",
                    op = "send_and_save",
                    case_id,
                    user_id,
                    "Reminder already recorded today, skipping"
                );
                Ok(SendOutcome::AlreadyExists)
            }
        }
    }

    async fn deliver(&self, notification: &Notification) -> bool {
        let user_id = notification.user_id;
        let Some(channel) = self.presence.lookup(user_id).await else {
            debug!(
                subsystem = "jobs",
                component = "reminder_engine",
                user_id,
                notification_id = notification.id,
                "Recipient offline, reminder kept for pull"
            );
            return false;
        };

        let event = PushEvent::Notification(NotificationPayload::reminder(notification.clone()));
        let delivered = channel.push(event);
        debug!(
            subsystem = "jobs",
            component = "reminder_engine",
            user_id,
            notification_id = notification.id,
            connection_id = %channel.connection_id(),
            delivered,
            "Reminder pushed"
        );
        delivered
    }

    /// Full batch over every owner. Returns [`BatchRun::Skipped`] when a
    /// previous full run has not finished yet.
    pub async fn check_upcoming_cases(&self) -> Result<BatchRun> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            info!(
                subsystem = "jobs",
                component = "reminder_engine",
                op = "check_upcoming_cases",
                "Previous reminder run still in flight, skipping"
            );
            return Ok(BatchRun::Skipped);
        };
        self.run_batch(None).await.map(BatchRun::Completed)
    }

    /// Batch restricted to one owner, used right after login.
    pub async fn check_pending_notifications(&self, user_id: i64) -> Result<BatchReport> {
        self.run_batch(Some(user_id)).await
    }

    #[instrument(skip(self), fields(subsystem = "jobs", component = "reminder_engine"))]
    async fn run_batch(&self, user_id: Option<i64>) -> Result<BatchReport> {
        let start = Instant::now();
        let day = calendar::tomorrow(self.clock.now());
        let due = self.cases.due_cases(day, user_id).await?;

        let mut report = BatchReport {
            scanned: due.len(),
            ..Default::default()
        };

        for case in due {
            let message = calendar::reminder_message(&case.title, case.date);
            match self
                .send_and_save_notification(case.user_id, message, case.id)
                .await
            {
                Ok(SendOutcome::Created { delivered, .. }) => {
                    report.created += 1;
                    if delivered {
                        report.delivered += 1;
                    }
                }
                Ok(SendOutcome::AlreadyExists) => report.duplicates += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        case_id = case.id,
                        user_id = case.user_id,
                        error = %e,
                        "Reminder failed for case, continuing"
                    );
                }
            }
        }

        info!(
            %day,
            scanned = report.scanned,
            created = report.created,
            duplicates = report.duplicates,
            failed = report.failed,
            delivered = report.delivered,
            duration_ms = start.elapsed().as_millis() as u64,
            "Reminder run complete"
        );
        Ok(report)
    }
}
