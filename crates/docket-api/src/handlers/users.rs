//! Admin user management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use docket_core::{defaults, CreateUserRequest, UpdateUserRequest, User, ROLE_ADMIN, ROLE_USER};

use crate::auth::{hash_password, AdminUser};
use crate::error::ApiError;
use crate::AppState;

const MSG_USER_NOT_FOUND: &str = "Pengguna tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

fn check_role(role: &str) -> Result<(), ApiError> {
    if role == ROLE_ADMIN || role == ROLE_USER {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Role tidak valid: {role}")))
    }
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < defaults::PASSWORD_MIN_LEN {
        return Err(ApiError::bad_request("Password minimal 6 karakter"));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.users.list().await?))
}

pub async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Username, email, dan password harus diisi"));
    }
    check_password(&body.password)?;
    let role = body.role.unwrap_or_else(|| ROLE_USER.to_string());
    check_role(&role)?;

    let user = state
        .db
        .users
        .create(&CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(&body.password)?,
            role,
            position: blank_to_none(body.position),
            phone: blank_to_none(body.phone),
            office: blank_to_none(body.office),
        })
        .await?;

    info!(
        subsystem = "api",
        component = "users",
        op = "create",
        admin_id = admin.user_id,
        user_id = user.id,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<User>, ApiError> {
    let password_hash = match blank_to_none(body.password) {
        Some(password) => {
            check_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };
    if let Some(role) = &body.role {
        check_role(role)?;
    }

    let user = state
        .db
        .users
        .update(
            id,
            &UpdateUserRequest {
                username: blank_to_none(body.username),
                email: blank_to_none(body.email),
                password_hash,
                role: body.role,
                position: body.position,
                phone: body.phone,
                office: body.office,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_USER_NOT_FOUND))?;

    info!(
        subsystem = "api",
        component = "users",
        op = "update",
        admin_id = admin.user_id,
        user_id = id,
        "User updated"
    );
    Ok(Json(user))
}

pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.users.delete(id).await.map_err(|e| match e {
        docket_core::Error::NotFound(_) => ApiError::not_found(MSG_USER_NOT_FOUND),
        other => other.into(),
    })?;

    // Best effort once the rows are committed.
    let prefix = format!("{id}/");
    match state.storage.list(&prefix).await {
        Ok(keys) => {
            for key in keys {
                if let Err(e) = state.storage.delete(&key).await {
                    warn!(subsystem = "api", component = "users", user_id = id, storage_key = %key, error = %e, "Object cleanup failed");
                }
            }
        }
        Err(e) => warn!(subsystem = "api", component = "users", user_id = id, error = %e, "Object listing failed"),
    }

    info!(
        subsystem = "api",
        component = "users",
        op = "delete",
        admin_id = admin.user_id,
        user_id = id,
        "User deleted"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Pengguna berhasil dihapus",
    })))
}
