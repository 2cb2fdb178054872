//! Notification repository implementation.
//!
//! `record_reminder` is the only writer of reminder rows. It holds the case
//! row lock for the duration of the insert and the flag update, and relies on
//! the `(case_id, user_id, notify_day)` unique index for idempotence.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres};
use tracing::debug;

use docket_core::{
    calendar, defaults, Error, Notification, NotificationStore, ReminderDraft, ReminderRecord,
    Result,
};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, case_id, message, is_read, is_sent, schedule_date, type, notify_day, created_at";

/// PostgreSQL implementation of notification storage.
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Notifications addressed to `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Mark one of the recipient's notifications as read.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> Result<Notification> {
        let sql = format!(
            "UPDATE notifications SET is_read = TRUE \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("notification {id}")))
    }

    /// Count reminder rows for a case, across all days.
    pub async fn count_for_case(&self, case_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE case_id = $1")
            .bind(case_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl NotificationStore for PgNotificationRepository {
    async fn record_reminder(&self, draft: ReminderDraft) -> Result<ReminderRecord> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let case_date: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT date FROM cases WHERE id = $1 FOR UPDATE")
                .bind(draft.case_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        let Some(case_date) = case_date else {
            return Err(Error::CaseNotFound(draft.case_id));
        };

        let sql = format!(
            "INSERT INTO notifications \
                 (user_id, case_id, message, is_read, is_sent, schedule_date, type, notify_day) \
             VALUES ($1, $2, $3, FALSE, TRUE, $4, $5, $6) \
             ON CONFLICT (case_id, user_id, notify_day) DO NOTHING \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Notification>(&sql)
            .bind(draft.user_id)
            .bind(draft.case_id)
            .bind(&draft.message)
            .bind(calendar::day_before(case_date))
            .bind(defaults::REMINDER_KIND)
            .bind(draft.notify_day)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("UPDATE cases SET notification_sent = TRUE WHERE id = $1")
            .bind(draft.case_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        match inserted {
            Some(notification) => {
                debug!(
                    subsystem = "db",
                    component = "notifications",
                    op = "record_reminder",
                    case_id = draft.case_id,
                    user_id = draft.user_id,
                    notification_id = notification.id,
                    "Reminder recorded"
                );
                Ok(ReminderRecord::Created(notification))
            }
            None => {
                debug!(
                    subsystem = "db",
                    component = "notifications",
                    op = "record_reminder",
                    case_id = draft.case_id,
                    user_id = draft.user_id,
                    "Reminder already recorded for this day"
                );
                Ok(ReminderRecord::AlreadyExists)
            }
        }
    }
}
