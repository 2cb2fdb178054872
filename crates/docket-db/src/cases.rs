//! Case repository implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use tracing::{debug, trace};

use docket_core::{Case, CaseDetail, CaseInput, CaseStore, DueCase, Error, Result};

const CASE_COLUMNS: &str = "id, user_id, created_by, title, date, type, description, parties, \
     witnesses, prosecutor, COALESCE(NULLIF(status, ''), 'Pending') AS status, \
     notification_sent, created_at";

/// PostgreSQL implementation of case storage.
pub struct PgCaseRepository {
    pool: Pool<Postgres>,
}

impl PgCaseRepository {
    /// Create a new PgCaseRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Cases owned by `user_id`, newest hearing first. `case_type` matches
    /// case-insensitively.
    pub async fn list_for_owner(&self, user_id: i64, case_type: Option<&str>) -> Result<Vec<Case>> {
        let sql = format!(
            "SELECT {CASE_COLUMNS} FROM cases \
             WHERE user_id = $1 AND ($2::text IS NULL OR LOWER(type) = LOWER($2)) \
             ORDER BY date DESC"
        );
        let cases = sqlx::query_as::<_, Case>(&sql)
            .bind(user_id)
            .bind(case_type)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "cases",
            op = "list",
            user_id,
            result_count = cases.len(),
            "Listed cases"
        );
        Ok(cases)
    }

    /// One owned case joined with its creator's username.
    pub async fn get_detail(&self, id: i64, user_id: i64) -> Result<Option<CaseDetail>> {
        sqlx::query_as::<_, CaseDetail>(
            r#"
            SELECT c.id, c.user_id, c.created_by, c.title, c.date, c.type, c.description,
                   c.parties, c.witnesses, c.prosecutor,
                   COALESCE(NULLIF(c.status, ''), 'Pending') AS status,
                   c.notification_sent, c.created_at,
                   u.username AS created_by_username,
                   to_char(c.date, 'YYYY-MM-DD') AS formatted_date
            FROM cases c
            LEFT JOIN users u ON u.id = c.created_by
            WHERE c.id = $1 AND c.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Insert a case owned and created by `user_id`.
    pub async fn create(&self, user_id: i64, input: &CaseInput) -> Result<Case> {
        let sql = format!(
            "INSERT INTO cases (user_id, created_by, title, date, type, description, parties, \
                                witnesses, prosecutor, status) \
             VALUES ($1, $1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {CASE_COLUMNS}"
        );
        let case = sqlx::query_as::<_, Case>(&sql)
            .bind(user_id)
            .bind(&input.title)
            .bind(input.date)
            .bind(&input.case_type)
            .bind(&input.description)
            .bind(&input.parties)
            .bind(&input.witnesses)
            .bind(&input.prosecutor)
            .bind(&input.status)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "cases",
            op = "create",
            case_id = case.id,
            user_id,
            "Case created"
        );
        Ok(case)
    }

    /// Replace the editable fields of an owned case.
    ///
    /// `notification_sent` is left as is, even when the date moves.
    pub async fn update(&self, id: i64, user_id: i64, input: &CaseInput) -> Result<Option<Case>> {
        let sql = format!(
            "UPDATE cases SET title = $3, date = $4, type = $5, description = $6, parties = $7, \
                    witnesses = $8, prosecutor = $9, status = $10, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {CASE_COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&input.title)
            .bind(input.date)
            .bind(&input.case_type)
            .bind(&input.description)
            .bind(&input.parties)
            .bind(&input.witnesses)
            .bind(&input.prosecutor)
            .bind(&input.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn update_status(&self, id: i64, user_id: i64, status: &str) -> Result<Option<Case>> {
        let sql = format!(
            "UPDATE cases SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {CASE_COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Delete an owned case and its notifications in one transaction.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let owned: Option<i64> =
            sqlx::query_scalar("SELECT id FROM cases WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if owned.is_none() {
            return Err(Error::CaseNotFound(id));
        }

        sqlx::query("DELETE FROM notifications WHERE case_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM cases WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "cases",
            op = "delete",
            case_id = id,
            user_id,
            "Case deleted"
        );
        Ok(())
    }
}

#[async_trait]
impl CaseStore for PgCaseRepository {
    async fn due_cases(&self, day: NaiveDate, user_id: Option<i64>) -> Result<Vec<DueCase>> {
        let cases = sqlx::query_as::<_, DueCase>(
            r#"
            SELECT c.id, u.id AS user_id, c.title, c.date
            FROM cases c
            JOIN users u ON u.id = c.user_id
            WHERE c.date::date = $1
              AND c.notification_sent = FALSE
              AND ($2::bigint IS NULL OR c.user_id = $2)
            "#,
        )
        .bind(day)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        trace!(
            subsystem = "db",
            component = "cases",
            op = "due_cases",
            %day,
            result_count = cases.len(),
            "Fetched due cases"
        );
        Ok(cases)
    }
}
