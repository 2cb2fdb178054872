//! Pull side of notifications.

use axum::extract::{Path, State};
use axum::Json;

use docket_core::{Error, Notification};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

pub async fn list_notifications(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.db.notifications.list_for_user(claims.user_id).await?))
}

pub async fn mark_notification_read(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, ApiError> {
    match state.db.notifications.mark_read(id, claims.user_id).await {
        Ok(notification) => Ok(Json(notification)),
        Err(Error::NotFound(_)) => Err(ApiError::not_found("Notifikasi tidak ditemukan")),
        Err(e) => Err(e.into()),
    }
}
