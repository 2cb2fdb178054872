//! Health, database probe and the manual reminder trigger.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

use docket_jobs::BatchRun;

use crate::auth::AuthUser;
use crate::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn test_db(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(now) => {
            docket_db::log_pool_metrics(state.db.pool());
            Json(json!({
                "message": "Koneksi database berhasil",
                "timestamp": now,
            }))
            .into_response()
        }
        Err(e) => {
            error!(subsystem = "api", component = "system", error = %e, "Database probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Gagal terhubung ke database" })),
            )
                .into_response()
        }
    }
}

/// Run the full reminder batch now.
pub async fn check_notifications(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> Response {
    info!(
        subsystem = "api",
        component = "system",
        user_id = claims.user_id,
        "Manual reminder check requested"
    );

    match state.engine.check_upcoming_cases().await {
        Ok(BatchRun::Completed(report)) => Json(json!({
            "message": "Notification check triggered successfully",
            "report": report,
        }))
        .into_response(),
        Ok(BatchRun::Skipped) => Json(json!({
            "message": "Notification check triggered successfully",
            "skipped": true,
        }))
        .into_response(),
        Err(e) => {
            error!(subsystem = "api", component = "system", error = %e, "Manual reminder check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to check notifications" })),
            )
                .into_response()
        }
    }
}
