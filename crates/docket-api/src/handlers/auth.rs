//! Login, logout and token echo.

use std::sync::OnceLock;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use docket_core::defaults;

use crate::auth::{issue_token, verify_password, AuthUser};
use crate::error::ApiError;
use crate::AppState;

const MSG_BAD_CREDENTIALS: &str = "Email atau password salah";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: LoginUser,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

/// Validate the login body, returning the trimmed email and the password.
pub fn validate_login(req: &LoginRequest) -> Result<(String, String), ApiError> {
    let email = req.email.as_deref().map(str::trim).unwrap_or_default();
    let password = req.password.as_deref().unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email dan password harus diisi"));
    }
    if !email_regex().is_match(email) {
        return Err(ApiError::bad_request("Format email tidak valid"));
    }
    if password.chars().count() < defaults::PASSWORD_MIN_LEN {
        return Err(ApiError::bad_request("Password minimal 6 karakter"));
    }
    Ok((email.to_string(), password.to_string()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (email, password) = validate_login(&req)?;

    let user = state
        .db
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| {
            info!(subsystem = "api", component = "auth", "Login rejected");
            ApiError::unauthorized(MSG_BAD_CREDENTIALS)
        })?;

    let token = issue_token(
        &state.config.jwt_secret,
        &user,
        state.config.jwt_ttl_secs,
        Utc::now(),
    )?;

    // Reminders for tomorrow go out as soon as the owner shows up.
    match state.engine.check_pending_notifications(user.id).await {
        Ok(report) => info!(
            subsystem = "api",
            component = "auth",
            user_id = user.id,
            created = report.created,
            "Pending reminders checked after login"
        ),
        Err(e) => warn!(
            subsystem = "api",
            component = "auth",
            user_id = user.id,
            error = %e,
            "Pending reminder check failed after login"
        ),
    }

    info!(
        subsystem = "api",
        component = "auth",
        user_id = user.id,
        role = %user.role,
        "Login successful"
    );

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: LoginUser {
            id: user.id,
            username: user.username,
            role: user.role,
        },
    }))
}

pub async fn logout(AuthUser(claims): AuthUser) -> Json<serde_json::Value> {
    info!(subsystem = "api", component = "auth", user_id = claims.user_id, "Logout");
    Json(json!({ "message": "Logout berhasil" }))
}

pub async fn test_auth(AuthUser(claims): AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "message": "Autentikasi berhasil", "user": claims }))
}
