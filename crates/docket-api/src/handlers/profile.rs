//! The caller's own profile and avatar.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use docket_core::{defaults, UpdateUserRequest, User};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::upload::{check_upload, extension_of, read_form};
use crate::AppState;

const MSG_PROFILE_NOT_FOUND: &str = "User tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub office: Option<String>,
}

pub async fn get_profile(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    state
        .db
        .users
        .get(claims.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(MSG_PROFILE_NOT_FOUND))
}

pub async fn update_profile(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ProfileBody>,
) -> Result<Json<User>, ApiError> {
    let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let user = state
        .db
        .users
        .update(
            claims.user_id,
            &UpdateUserRequest {
                username: trimmed(body.username),
                email: trimmed(body.email),
                position: body.position,
                phone: body.phone,
                office: body.office,
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_PROFILE_NOT_FOUND))?;

    Ok(Json(user))
}

/// Storage key for a new avatar.
pub fn avatar_key(user_id: i64, original_name: &str, millis: i64) -> String {
    format!(
        "{}/avatar-{}-{}{}",
        defaults::AVATAR_PREFIX,
        user_id,
        millis,
        extension_of(original_name)
    )
}

pub async fn upload_avatar(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_form(multipart, "avatar").await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("Tidak ada file yang diunggah"))?;

    check_upload(
        &file.data,
        &file.content_type,
        defaults::MAX_AVATAR_BYTES,
        defaults::ALLOWED_AVATAR_TYPES,
        "Hanya file gambar yang diizinkan",
    )?;

    let key = avatar_key(claims.user_id, &file.file_name, Utc::now().timestamp_millis());
    state.storage.write(&key, &file.data).await?;

    let avatar_url = format!("/uploads/{key}");
    let updated = state.db.users.set_avatar(claims.user_id, &avatar_url).await?;
    if updated.is_none() {
        state.storage.delete(&key).await?;
        return Err(ApiError::not_found("Pengguna tidak ditemukan"));
    }

    info!(
        subsystem = "api",
        component = "profile",
        user_id = claims.user_id,
        storage_key = %key,
        size = file.data.len(),
        "Avatar updated"
    );
    Ok(Json(json!({
        "success": true,
        "message": "Avatar berhasil diupload",
        "avatar_url": avatar_url,
    })))
}
