//! User repository implementation.

use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use docket_core::{CreateUserRequest, Error, Result, UpdateUserRequest, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, position, phone, office, avatar_url, created_at";

/// Map a unique violation to `Error::Conflict`, anything else to `Error::Database`.
pub(crate) fn conflict_or_db(e: sqlx::Error, what: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("{what} already exists"))
        }
        _ => Error::Database(e),
    }
}

/// PostgreSQL implementation of user storage.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    pub async fn create(&self, req: &CreateUserRequest) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, position, phone, office) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&req.username)
            .bind(&req.email)
            .bind(&req.password_hash)
            .bind(&req.role)
            .bind(&req.position)
            .bind(&req.phone)
            .bind(&req.office)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "email"))?;

        debug!(
            subsystem = "db",
            component = "users",
            op = "create",
            user_id = user.id,
            "User created"
        );
        Ok(user)
    }

    /// Apply a partial update. Returns `None` when the user does not exist.
    pub async fn update(&self, id: i64, req: &UpdateUserRequest) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 role = COALESCE($5, role), \
                 position = COALESCE($6, position), \
                 phone = COALESCE($7, phone), \
                 office = COALESCE($8, office) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&req.username)
            .bind(&req.email)
            .bind(&req.password_hash)
            .bind(&req.role)
            .bind(&req.position)
            .bind(&req.phone)
            .bind(&req.office)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "email"))
    }

    pub async fn set_avatar(&self, id: i64, avatar_url: &str) -> Result<Option<User>> {
        let sql = format!("UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(avatar_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Delete a user and everything they own in one transaction.
    ///
    /// Order: files, folders, notifications, cases, user. A missing user
    /// rolls the whole transaction back with `Error::NotFound`.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM files WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM folders WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query(
            "DELETE FROM notifications \
             WHERE user_id = $1 OR case_id IN (SELECT id FROM cases WHERE user_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("DELETE FROM cases WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(Error::Database)?;
            return Err(Error::NotFound(format!("user {id}")));
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "users",
            op = "delete",
            user_id = id,
            "User and owned records deleted"
        );
        Ok(())
    }

    /// Create the initial administrator unless the email is already taken.
    ///
    /// Returns `true` when a new account was created.
    pub async fn create_admin_if_missing(&self, req: &CreateUserRequest) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(&req.email)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if existing.is_some() {
            tx.rollback().await.map_err(Error::Database)?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, position, phone, office) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.password_hash)
        .bind(&req.role)
        .bind(&req.position)
        .bind(&req.phone)
        .bind(&req.office)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_db(e, "email"))?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(true)
    }
}
