//! Scheduler trigger: runs the full reminder batch once at startup and then
//! every hour at a fixed minute.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use docket_core::{defaults, Clock, Result};

use crate::reminder::{BatchRun, ReminderEngine};

/// Configuration for the reminder scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Whether the hourly trigger runs at all.
    pub enabled: bool,
    /// Whether to run one batch immediately on start.
    pub run_on_startup: bool,
    /// Minute of the hour to fire at (0-59).
    pub minute: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_startup: true,
            minute: defaults::REMINDER_CRON_MINUTE,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REMINDER_SCHEDULER_ENABLED` | `true` | Enable/disable the hourly trigger |
    /// | `REMINDER_RUN_ON_STARTUP` | `true` | Run one batch when the process starts |
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true)
        };

        Self {
            enabled: flag("REMINDER_SCHEDULER_ENABLED"),
            run_on_startup: flag("REMINDER_RUN_ON_STARTUP"),
            minute: defaults::REMINDER_CRON_MINUTE,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_run_on_startup(mut self, run: bool) -> Self {
        self.run_on_startup = run;
        self
    }

    pub fn with_minute(mut self, minute: u32) -> Self {
        self.minute = minute % 60;
        self
    }
}

/// Fires closer together than this belong to the same slot.
const MIN_FIRE_GAP: Duration = Duration::from_secs(1);

/// Time from `now` until the next wall-clock `HH:minute:00`.
///
/// A monotonic sleep can wake slightly before the wall-clock target; a wait
/// shorter than [`MIN_FIRE_GAP`] is pushed to the following hour so one slot
/// never fires twice.
pub fn until_next_fire(now: NaiveDateTime, minute: u32) -> Duration {
    let into_hour = i64::from(now.minute() * 60 + now.second());
    let target = i64::from((minute % 60) * 60);
    let mut wait = target - into_hour;
    if wait <= 0 {
        wait += 3600;
    }
    let wait = Duration::from_secs(wait as u64).saturating_sub(Duration::from_nanos(u64::from(
        now.nanosecond().min(999_999_999),
    )));
    if wait < MIN_FIRE_GAP {
        wait + Duration::from_secs(3600)
    } else {
        wait
    }
}

/// Handle for a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop and wait for the loop to exit.
    ///
    /// A batch already in progress finishes first.
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already have exited (disabled scheduler).
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| docket_core::Error::Internal(format!("Scheduler task failed: {e}")))
    }
}

/// Fires the reminder engine on a fixed hourly cadence.
pub struct ReminderScheduler {
    engine: Arc<ReminderEngine>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl ReminderScheduler {
    pub fn new(engine: Arc<ReminderEngine>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            clock,
            config,
        }
    }

    /// Start the scheduler loop and return a handle for control.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });
        SchedulerHandle { shutdown_tx, task }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if self.config.run_on_startup {
            self.fire("startup").await;
        }

        if !self.config.enabled {
            info!(
                subsystem = "jobs",
                component = "scheduler",
                "Reminder scheduler is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            component = "scheduler",
            minute = self.config.minute,
            "Reminder scheduler started"
        );

        loop {
            let delay = until_next_fire(self.clock.now(), self.config.minute);
            debug!(
                subsystem = "jobs",
                component = "scheduler",
                delay_secs = delay.as_secs(),
                "Next reminder run scheduled"
            );

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", component = "scheduler", "Reminder scheduler received shutdown signal");
                    break;
                }
                _ = sleep(delay) => self.fire("hourly").await,
            }
        }

        info!(subsystem = "jobs", component = "scheduler", "Reminder scheduler stopped");
    }

    async fn fire(&self, trigger: &'static str) {
        match self.engine.check_upcoming_cases().await {
            Ok(BatchRun::Completed(report)) => debug!(
                subsystem = "jobs",
                component = "scheduler",
                trigger,
                created = report.created,
                "Scheduled reminder run finished"
            ),
            Ok(BatchRun::Skipped) => {}
            Err(e) => error!(
                subsystem = "jobs",
                component = "scheduler",
                trigger,
                error = %e,
                "Scheduled reminder run failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use docket_core::{CaseStore, DueCase, FixedClock, NotificationStore, ReminderDraft, ReminderRecord};

    use crate::presence::PresenceRegistry;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    /// Reports every scan on a channel and never has due cases.
    struct ScanProbe(mpsc::UnboundedSender<()>);

    #[async_trait]
    impl CaseStore for ScanProbe {
        async fn due_cases(&self, _: NaiveDate, _: Option<i64>) -> Result<Vec<DueCase>> {
            let _ = self.0.send(());
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl NotificationStore for ScanProbe {
        async fn record_reminder(&self, _: ReminderDraft) -> Result<ReminderRecord> {
            Ok(ReminderRecord::AlreadyExists)
        }
    }

    fn scheduler(config: SchedulerConfig) -> (ReminderScheduler, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let probe = Arc::new(ScanProbe(tx));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(at(14, 0, 0)));
        let engine = Arc::new(ReminderEngine::new(
            probe.clone(),
            probe,
            PresenceRegistry::spawn(),
            clock.clone(),
        ));
        (ReminderScheduler::new(engine, clock, config), rx)
    }

    #[test]
    fn test_until_next_fire_on_the_hour_waits_full_hour() {
        assert_eq!(until_next_fire(at(14, 0, 0), 0), Duration::from_secs(3600));
    }

    #[test]
    fn test_until_next_fire_mid_hour() {
        assert_eq!(until_next_fire(at(14, 59, 30), 0), Duration::from_secs(30));
        assert_eq!(until_next_fire(at(14, 10, 0), 0), Duration::from_secs(50 * 60));
        assert_eq!(until_next_fire(at(14, 10, 0), 15), Duration::from_secs(5 * 60));
    }

    #[test]
    fn test_until_next_fire_subtracts_subsecond() {
        let now = at(14, 59, 58) + chrono::Duration::milliseconds(500);
        assert_eq!(until_next_fire(now, 0), Duration::from_millis(1500));
    }

    #[test]
    fn test_early_wakeup_rolls_to_next_hour() {
        // Sleep ended a few milliseconds before the wall-clock slot.
        let now = at(14, 59, 59) + chrono::Duration::milliseconds(950);
        assert_eq!(until_next_fire(now, 0), Duration::from_millis(3600_050));
    }

    #[test]
    fn test_config_builder() {
        let config = SchedulerConfig::default()
            .with_enabled(false)
            .with_run_on_startup(false)
            .with_minute(75);
        assert!(!config.enabled);
        assert!(!config.run_on_startup);
        assert_eq!(config.minute, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_at_startup_then_hourly() {
        let (scheduler, mut scans) = scheduler(SchedulerConfig::default());
        let handle = scheduler.start();

        // Startup run.
        scans.recv().await.expect("startup scan");
        // Paused time auto-advances to the next top of the hour.
        scans.recv().await.expect("first hourly scan");
        scans.recv().await.expect("second hourly scan");

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_run_can_be_disabled() {
        let (scheduler, mut scans) = scheduler(SchedulerConfig::default().with_run_on_startup(false));
        let start = tokio::time::Instant::now();
        let handle = scheduler.start();

        scans.recv().await.expect("hourly scan");
        assert!(start.elapsed() >= Duration::from_secs(3600));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_scheduler_only_runs_startup_batch() {
        let (scheduler, mut scans) = scheduler(SchedulerConfig::default().with_enabled(false));
        let handle = scheduler.start();

        scans.recv().await.expect("startup scan");
        handle.shutdown().await.unwrap();
        assert!(scans.try_recv().is_err());
    }
}
