//! Server configuration loaded from the environment.

use docket_core::{defaults, Error, Result};

/// Signing key used by debug builds when `JWT_SECRET` is unset.
const DEV_JWT_SECRET: &str = "docket-dev-secret-change-me";

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub allowed_origins: Vec<String>,
    pub file_storage_path: String,
}

impl ApiConfig {
    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `5000` |
    /// | `DATABASE_URL` | `postgres://localhost/docket` |
    /// | `JWT_SECRET` | required in release builds |
    /// | `JWT_TTL_SECS` | `3600` |
    /// | `ALLOWED_ORIGINS` | localhost:3000,3001,3002 |
    /// | `FILE_STORAGE_PATH` | `./uploads` |
    pub fn from_env() -> Result<Self> {
        let jwt_secret = match non_empty_env("JWT_SECRET") {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                tracing::warn!(
                    subsystem = "api",
                    component = "config",
                    "JWT_SECRET not set, using development key"
                );
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(Error::Config("JWT_SECRET must be set".to_string())),
        };

        let port = match non_empty_env("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PORT: {raw}")))?,
            None => defaults::SERVER_PORT,
        };

        let jwt_ttl_secs = match non_empty_env("JWT_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid JWT_TTL_SECS: {raw}")))?,
            None => defaults::JWT_TTL_SECS,
        };

        Ok(Self {
            host: non_empty_env("HOST").unwrap_or_else(|| defaults::SERVER_HOST.to_string()),
            port,
            database_url: non_empty_env("DATABASE_URL")
                .unwrap_or_else(|| defaults::DATABASE_URL.to_string()),
            jwt_secret,
            jwt_ttl_secs,
            allowed_origins: parse_origins(
                &non_empty_env("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| defaults::ALLOWED_ORIGINS.to_string()),
            ),
            file_storage_path: non_empty_env("FILE_STORAGE_PATH")
                .unwrap_or_else(|| defaults::FILE_STORAGE_PATH.to_string()),
        })
    }

    /// Configuration for tests: fixed secret, no network assumptions.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: defaults::DATABASE_URL.to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_ttl_secs: defaults::JWT_TTL_SECS,
            allowed_origins: parse_origins(defaults::ALLOWED_ORIGINS),
            file_storage_path: defaults::FILE_STORAGE_PATH.to_string(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
