//! docket API server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docket_api::{router, ApiConfig, AppState};
use docket_core::{Clock, SystemClock};
use docket_db::{Database, FilesystemBackend, PoolConfig, StorageBackend};
use docket_jobs::{PresenceRegistry, ReminderEngine, ReminderScheduler, SchedulerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Keep the guard alive for the lifetime of the process so buffered file
    // logs are flushed on exit.
    let _log_guard = init_tracing();

    let config = ApiConfig::from_env().context("invalid configuration")?;

    info!(
        subsystem = "api",
        component = "startup",
        version = env!("CARGO_PKG_VERSION"),
        "Starting docket API"
    );

    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env())
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    let now = db.ping().await.context("database probe failed")?;
    info!(subsystem = "api", component = "startup", db_time = %now, "Database connection verified");

    let storage = FilesystemBackend::new(&config.file_storage_path);
    storage
        .validate()
        .await
        .with_context(|| format!("storage at {} is not usable", config.file_storage_path))?;
    let storage: Arc<dyn StorageBackend> = Arc::new(storage);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let presence = PresenceRegistry::spawn();
    let engine = Arc::new(ReminderEngine::new(
        db.cases.clone(),
        db.notifications.clone(),
        presence,
        clock.clone(),
    ));

    let scheduler =
        ReminderScheduler::new(engine.clone(), clock, SchedulerConfig::from_env()).start();

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    let state = AppState {
        db,
        engine,
        storage,
        config: Arc::new(config),
    };
    let app = router(state);

    info!(subsystem = "api", component = "startup", %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(subsystem = "api", component = "shutdown", "Stopping reminder scheduler");
    if let Err(e) = scheduler.shutdown().await {
        warn!(subsystem = "api", component = "shutdown", error = %e, "Scheduler did not stop cleanly");
    }

    Ok(())
}

/// Initialise tracing from `RUST_LOG`, `LOG_FORMAT`, `LOG_FILE` and `LOG_ANSI`.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docket_api=debug,docket_jobs=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let ansi = std::env::var("LOG_ANSI")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    let (file_writer, guard) = match std::env::var("LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let path = std::path::Path::new(&path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file = path
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| "docket.log".into());
            let appender = tracing_appender::rolling::daily(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        _ => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match (json, file_writer) {
        (true, Some(writer)) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        (true, None) => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        (false, Some(writer)) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .init(),
        (false, None) => registry
            .with(tracing_subscriber::fmt::layer().with_ansi(ansi))
            .init(),
    }

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(subsystem = "api", component = "shutdown", "Shutdown signal received");
}
