//! Core data models for docket.
//!
//! These types are shared across all docket crates and represent
//! the core domain entities.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;

// =============================================================================
// USER TYPES
// =============================================================================

/// Role granting access to user administration.
pub const ROLE_ADMIN: &str = "admin";

/// Default role for accounts created through the admin API.
pub const ROLE_USER: &str = "user";

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Request for creating a user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

/// Partial user update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

// =============================================================================
// CASE TYPES
// =============================================================================

/// A scheduled legal matter owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Case {
    pub id: i64,
    pub user_id: Option<i64>,
    pub created_by: Option<i64>,
    pub title: String,
    /// Hearing date and time, server-local.
    pub date: NaiveDateTime,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub case_type: String,
    pub description: String,
    pub parties: String,
    pub witnesses: String,
    pub prosecutor: String,
    pub status: String,
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// A case joined with its creator, as shown on the detail page.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub case: Case,
    pub created_by_username: Option<String>,
    /// `YYYY-MM-DD` rendering of `date`.
    pub formatted_date: String,
}

/// Fields accepted when creating or replacing a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInput {
    pub title: String,
    pub date: NaiveDateTime,
    #[serde(rename = "type")]
    pub case_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parties: String,
    #[serde(default)]
    pub witnesses: String,
    #[serde(default)]
    pub prosecutor: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    defaults::CASE_STATUS.to_string()
}

/// The slice of a case the reminder engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DueCase {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub date: NaiveDateTime,
}

// =============================================================================
// NOTIFICATION TYPES
// =============================================================================

/// A persisted reminder for one case and one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub case_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub is_sent: bool,
    pub schedule_date: Option<NaiveDateTime>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Calendar day the reminder was recorded; part of the uniqueness key.
    #[serde(skip_serializing)]
    pub notify_day: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to record one reminder atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub case_id: i64,
    pub user_id: i64,
    pub message: String,
    pub notify_day: NaiveDate,
}

/// Result of an idempotent reminder write.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderRecord {
    /// A new row was inserted and the case flagged as notified.
    Created(Notification),
    /// A reminder for this (case, user, day) already existed; nothing new
    /// was inserted.
    AlreadyExists,
}

/// Notification decorated for display, as pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    #[serde(flatten)]
    pub notification: Notification,
    pub title: String,
}

impl NotificationPayload {
    pub fn reminder(notification: Notification) -> Self {
        Self {
            notification,
            title: defaults::REMINDER_TITLE.to_string(),
        }
    }
}

// =============================================================================
// FILE TYPES
// =============================================================================

/// A user-owned folder. `path` is the parent path (`""` for root).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Folder {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Full path of the folder itself, used as the prefix for its contents.
    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.name)
    }
}

/// Metadata for an uploaded object.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredFile {
    pub id: i64,
    pub user_id: i64,
    /// Storage key leaf.
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub folder_id: Option<i64>,
    /// Object key within the storage backend. Fixed at upload time.
    #[serde(skip_serializing, default)]
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// Request for recording an uploaded object.
#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    pub user_id: i64,
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: i64,
    pub folder_id: Option<i64>,
    pub storage_key: String,
}

/// Folders and files at one path.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListing {
    pub folders: Vec<Folder>,
    pub files: Vec<StoredFile>,
}

/// Storage key of an object owned by `user_id` at `path`.
pub fn object_key(user_id: i64, path: &str, leaf: &str) -> String {
    format!("{}/{}", user_id, join_path(path, leaf))
}

/// Join a parent path and a leaf name with `/`, treating `""` as root.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notification() -> Notification {
        Notification {
            id: 1,
            user_id: 7,
            case_id: Some(42),
            message: "Reminder".to_string(),
            is_read: false,
            is_sent: true,
            schedule_date: NaiveDate::from_ymd_opt(2026, 10, 16)
                .and_then(|d| d.and_hms_opt(9, 0, 0)),
            kind: "reminder".to_string(),
            notify_day: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 16, 1, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_join_path_root_and_nested() {
        assert_eq!(join_path("", "a.pdf"), "a.pdf");
        assert_eq!(join_path("docs", "a.pdf"), "docs/a.pdf");
        assert_eq!(join_path("/docs/2026/", "a.pdf"), "docs/2026/a.pdf");
    }

    #[test]
    fn test_object_key_is_scoped_by_owner() {
        assert_eq!(object_key(7, "", "1-a.pdf"), "7/1-a.pdf");
        assert_eq!(object_key(7, "docs/2026", ".keep"), "7/docs/2026/.keep");
    }

    #[test]
    fn test_folder_full_path() {
        let folder = Folder {
            id: 1,
            user_id: 1,
            name: "evidence".to_string(),
            path: "cases".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(folder.full_path(), "cases/evidence");
    }

    #[test]
    fn test_reminder_payload_shape() {
        let payload = NotificationPayload::reminder(notification());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["title"], "Pengingat Jadwal");
        assert_eq!(json["type"], "reminder");
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["case_id"], 42);
        assert_eq!(json["is_read"], false);
        assert_eq!(json["is_sent"], true);
        assert!(json.get("notify_day").is_none());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: ROLE_ADMIN.to_string(),
            position: None,
            phone: None,
            office: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(user.is_admin());
    }

    #[test]
    fn test_case_input_defaults_status_to_pending() {
        let input: CaseInput = serde_json::from_str(
            r#"{"title":"Case A","date":"2026-10-17T09:00:00","type":"Pidana"}"#,
        )
        .unwrap();
        assert_eq!(input.status, "Pending");
        assert_eq!(input.case_type, "Pidana");
        assert!(input.description.is_empty());
    }
}
