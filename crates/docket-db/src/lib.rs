//! # docket-db
//!
//! PostgreSQL database layer for docket.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, cases, notifications, folders and files
//! - The atomic reminder write used by the notification engine
//! - Object storage backends for uploaded bytes
//!
//! ## Example
//!
//! ```rust,ignore
//! use docket_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/docket").await?;
//!     db.migrate().await?;
//!
//!     let cases = db.cases.list_for_owner(7, None).await?;
//!     println!("{} cases", cases.len());
//!     Ok(())
//! }
//! ```

pub mod cases;
pub mod files;
pub mod notifications;
pub mod pool;
pub mod storage;
pub mod users;

// Test fixtures for integration tests
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use docket_core::*;

pub use cases::PgCaseRepository;
pub use files::{escape_like, PgFileRepository};
pub use notifications::PgNotificationRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use storage::{FilesystemBackend, StorageBackend};
pub use users::PgUserRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: std::sync::Arc<PgUserRepository>,
    pub cases: std::sync::Arc<PgCaseRepository>,
    pub notifications: std::sync::Arc<PgNotificationRepository>,
    /// Folder and file metadata.
    pub files: std::sync::Arc<PgFileRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: std::sync::Arc::new(PgUserRepository::new(pool.clone())),
            cases: std::sync::Arc::new(PgCaseRepository::new(pool.clone())),
            notifications: std::sync::Arc::new(PgNotificationRepository::new(pool.clone())),
            files: std::sync::Arc::new(PgFileRepository::new(pool.clone())),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Round-trip `SELECT NOW()` to prove the database answers.
    pub async fn ping(&self) -> Result<chrono::DateTime<chrono::Utc>> {
        sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
