//! Database connection pool management.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use docket_core::{defaults, Error, Result};

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Kept at zero for pools that must not dial out eagerly.
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// `None` keeps connections until they fail.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            min_connections: defaults::DB_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
            max_lifetime: Some(Duration::from_secs(defaults::DB_MAX_LIFETIME_SECS)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `DB_MAX_CONNECTIONS`, falling back to the default on absence or garbage.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            config.max_connections = n;
        }
        config
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    fn options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout);

        if let Some(max_lifetime) = self.max_lifetime {
            options = options.max_lifetime(max_lifetime);
        }
        options
    }
}

/// Create a new PostgreSQL connection pool with default configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Create a new PostgreSQL connection pool with custom configuration.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Creating database connection pool"
    );

    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Build a pool that opens connections on first use.
///
/// Startup does not block on the database; used by tests that never touch it.
pub fn create_lazy_pool(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    config
        .options()
        .connect_lazy(database_url)
        .map_err(Error::Database)
}

/// Log pool occupancy; warns when every open connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let (size, idle) = (pool.size(), pool.num_idle());
    if size > 0 && idle == 0 {
        warn!(subsystem = "db", component = "pool", pool_size = size, "All pooled connections busy");
    } else {
        debug!(subsystem = "db", component = "pool", pool_size = size, pool_idle = idle, "Pool occupancy");
    }
}
