//! # docket-api
//!
//! HTTP surface for docket: authentication, user administration, cases,
//! notifications, file storage, the WebSocket push channel and the manual
//! reminder trigger.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use docket_core::defaults;
use docket_db::{Database, StorageBackend};
use docket_jobs::ReminderEngine;

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod upload;

pub use config::ApiConfig;
pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<ReminderEngine>,
    pub storage: Arc<dyn StorageBackend>,
    pub config: Arc<ApiConfig>,
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(subsystem = "api", origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    use handlers::{auth, cases, files, notifications, profile, system, users, ws};

    Router::new()
        .route("/health", get(system::health))
        .route("/api/test-db", get(system::test_db))
        .route("/api/check-notifications", post(system::check_notifications))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/test-auth", get(auth::test_auth))
        // Users (admin)
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        // Profile
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/profile/avatar", post(profile::upload_avatar))
        // Cases
        .route("/api/cases", get(cases::list_cases).post(cases::create_case))
        .route(
            "/api/cases/:id",
            get(cases::get_case)
                .put(cases::update_case)
                .delete(cases::delete_case),
        )
        .route("/api/cases/:id/status", put(cases::update_case_status))
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/:id/read",
            put(notifications::mark_notification_read),
        )
        // Files
        .route("/api/files", get(files::list_files))
        .route("/api/files/folders", post(files::create_folder))
        .route("/api/files/upload", post(files::upload_file))
        .route("/api/files/download/:id", get(files::download_file))
        .route("/api/files/files/:id", delete(files::delete_file))
        .route("/api/files/folders/:id", delete(files::delete_folder))
        .route("/api/files/rename/:kind/:id", put(files::rename))
        // Push channel
        .route("/api/ws", get(ws::ws_handler))
        // Public object URLs
        .route("/uploads/*key", get(files::serve_object))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(DefaultBodyLimit::max(defaults::MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_BYTES))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
