//! Centralized default constants for docket.
//!
//! All crates reference these constants instead of defining their own
//! magic numbers. Environment-driven configuration falls back to them.

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const SERVER_PORT: u16 = 5000;

/// Default CORS whitelist (local frontends).
pub const ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001,http://localhost:3002";

/// Maximum request body accepted by the API (covers the largest upload).
pub const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

// =============================================================================
// AUTH
// =============================================================================

/// Token lifetime in seconds (one hour).
pub const JWT_TTL_SECS: i64 = 3600;

/// Minimum accepted password length.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Upper bound on a bearer token before it is even decoded.
pub const MAX_TOKEN_LENGTH: usize = 8192;

// =============================================================================
// DATABASE
// =============================================================================

/// Default connection string for local development.
pub const DATABASE_URL: &str = "postgres://localhost/docket";

/// Default pool size.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default minimum idle connections.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds to wait for a pooled connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds an idle connection is kept.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Maximum connection lifetime in seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// CASES
// =============================================================================

/// Status assigned to cases created without one.
pub const CASE_STATUS: &str = "Pending";

// =============================================================================
// REMINDERS
// =============================================================================

/// Display title attached to pushed reminders.
pub const REMINDER_TITLE: &str = "Pengingat Jadwal";

/// `type` column value of reminder notifications.
pub const REMINDER_KIND: &str = "reminder";

/// Minute of the hour at which the scheduler fires.
pub const REMINDER_CRON_MINUTE: u32 = 0;

// =============================================================================
// FILES
// =============================================================================

/// Default object storage root.
pub const FILE_STORAGE_PATH: &str = "./uploads";

/// Maximum size of an uploaded document.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum size of an uploaded avatar.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Storage prefix for avatars.
pub const AVATAR_PREFIX: &str = "avatars";

/// Marker object written into new folders.
pub const FOLDER_MARKER: &str = ".keep";

/// MIME types accepted for document uploads.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// MIME types accepted for avatars.
pub const ALLOWED_AVATAR_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

// =============================================================================
// LIVE CHANNEL
// =============================================================================

/// Seconds between server pings on an idle socket.
pub const WS_PING_INTERVAL_SECS: u64 = 30;
