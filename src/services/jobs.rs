//! Analytics job execution: the periodic daily pipeline and on-demand
//! lifetime backfills.
//!
//! A run is a straight line through the pipeline (resolve schedules, read
//! events, build the plan, execute it) with suspension only at the store
//! boundaries. Store reads retry transient failures on a capped backoff;
//! upsert execution never retries inside a batch, the whole run does.
//! Cancellation is honored between stages, so a cancelled run commits
//! nothing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::data::{events, kv, schedules, summaries};
use crate::engine::error::JobError;
use crate::engine::pipeline::{JobReport, build_daily_plan, build_lifetime_plan};
use crate::engine::schedule::{
    ResolvedSchedule, UserBinding, WeekSchedule, resolve_for, resolve_schedules,
};
use crate::engine::working_time::ClipMode;
use crate::services::manager::Service;
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use crate::utils::{fmt_duration, log_if_slow};

/// app_kv key persisting the last successful daily run across restarts.
pub const KV_DAILY_RUN: &str = "jobs.daily_run";

/// Backoff schedule for transient store failures.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_secs(1),
    Duration::from_secs(5),
];

const SLOW_UPSERT_THRESHOLD: Duration = Duration::from_secs(30);

/// Executes analytics runs against a shared pool. Clone-cheap; web handlers
/// hold one alongside the periodic service.
#[derive(Clone)]
pub struct JobRunner {
    pool: PgPool,
    config: Arc<Config>,
}

impl JobRunner {
    pub fn new(pool: PgPool, config: Arc<Config>) -> Self {
        Self { pool, config }
    }

    /// Resolve the effective schedule of every bound principal.
    pub async fn resolved_schedules(&self) -> Result<Vec<ResolvedSchedule>, JobError> {
        let pool = &self.pool;
        let entries =
            with_retries("working-hours scan", || schedules::list_schedule_entries(pool)).await?;
        let bindings =
            with_retries("user-bindings scan", || schedules::list_user_bindings(pool)).await?;
        Ok(resolve_schedules(&entries, &bindings))
    }

    /// Look up the binding for one user, if they are bound at all.
    pub async fn find_binding(&self, user_id: i64) -> Result<Option<UserBinding>, JobError> {
        let pool = &self.pool;
        let bindings =
            with_retries("user-bindings scan", || schedules::list_user_bindings(pool)).await?;
        Ok(bindings.into_iter().find(|b| b.user_id == user_id))
    }

    /// One daily run: aggregate the recent ingestion window into
    /// `daily_performance_summary`.
    pub async fn run_daily(&self, cancel: &CancellationToken) -> Result<JobReport, JobError> {
        let start = Instant::now();
        let job_time = Utc::now();
        let mode = self.config.clip_mode();
        let tz = self.config.schedule_timezone;

        let schedule_map = self.schedule_map().await?;
        ensure_live(cancel)?;

        let since = job_time - self.config.event_window();
        let pool = &self.pool;
        let batch = with_retries("event-window scan", || events::list_recent(pool, since)).await?;
        ensure_live(cancel)?;

        let events_read = batch.len();
        let plan = build_daily_plan(batch, &schedule_map, tz, mode, job_time);
        ensure_live(cancel)?;

        let rows_upserted = self.execute(&plan).await?;

        let report = JobReport {
            kind: "daily",
            events_read,
            rows_planned: plan.row_count(),
            rows_upserted,
            duration_ms: start.elapsed().as_millis() as u64,
            legacy_clipping: mode == ClipMode::Containment,
        };
        info!(
            events = report.events_read,
            rows = report.rows_planned,
            upserted = report.rows_upserted,
            duration = fmt_duration(start.elapsed()),
            "daily analytics run complete"
        );
        Ok(report)
    }

    /// One lifetime backfill: re-aggregate every conversation of one user
    /// into `conversation_summary`. `use_simple` forces the legacy clipping
    /// for this run only.
    pub async fn run_backfill(
        &self,
        binding: UserBinding,
        org_id: i64,
        use_simple: bool,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobError> {
        let start = Instant::now();
        let job_time = Utc::now();
        let mode = if use_simple {
            ClipMode::Containment
        } else {
            self.config.clip_mode()
        };
        let tz = self.config.schedule_timezone;

        let pool = &self.pool;
        let entries =
            with_retries("working-hours scan", || schedules::list_schedule_entries(pool)).await?;
        let resolved = resolve_for(&entries, binding);
        info!(
            user_id = binding.user_id,
            source = ?resolved.source,
            "resolved schedule for backfill"
        );
        let schedule_map = HashMap::from([(binding.user_id, resolved.week)]);
        ensure_live(cancel)?;

        let mut batch = with_retries("user event scan", || {
            events::list_for_user(pool, binding.user_id)
        })
        .await?;
        batch.retain(|e| e.org_id == org_id);
        ensure_live(cancel)?;

        let events_read = batch.len();
        let plan = build_lifetime_plan(batch, &schedule_map, tz, mode, job_time);
        ensure_live(cancel)?;

        let rows_upserted = self.execute(&plan).await?;

        let report = JobReport {
            kind: "backfill",
            events_read,
            rows_planned: plan.row_count(),
            rows_upserted,
            duration_ms: start.elapsed().as_millis() as u64,
            legacy_clipping: mode == ClipMode::Containment,
        };
        info!(
            user_id = binding.user_id,
            org_id,
            events = report.events_read,
            rows = report.rows_planned,
            duration = fmt_duration(start.elapsed()),
            "backfill run complete"
        );
        Ok(report)
    }

    async fn schedule_map(&self) -> Result<HashMap<i64, WeekSchedule>, JobError> {
        Ok(self
            .resolved_schedules()
            .await?
            .into_iter()
            .map(|r| (r.user_id, r.week))
            .collect())
    }

    async fn execute(&self, plan: &crate::engine::plan::UpsertPlan) -> Result<u64, JobError> {
        let upsert_start = Instant::now();
        let rows = summaries::execute_plan(&self.pool, plan)
            .await
            .map_err(|e| JobError::UpsertConflict(e.into()))?;
        log_if_slow(upsert_start, SLOW_UPSERT_THRESHOLD, "upsert batch");
        Ok(rows)
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), JobError> {
    if cancel.is_cancelled() {
        Err(JobError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run a store read, retrying transient failures on the capped backoff
/// before surfacing a [`JobError::TransientIo`].
async fn with_retries<T, F, Fut>(label: &str, mut op: F) -> Result<T, JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if (attempt as usize) <= RETRY_DELAYS.len() => {
                let delay = RETRY_DELAYS[attempt as usize - 1];
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "{label} failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(JobError::TransientIo {
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}

/// Convert a persisted UTC timestamp to an `Instant`, preserving remaining
/// cooldown.
///
/// If the persisted time is older than `interval`, the returned `Instant`
/// triggers immediate execution; if it's recent, it reflects how much time
/// actually elapsed so restarts respect the remaining cooldown.
fn persisted_to_instant(persisted: Option<DateTime<Utc>>, interval: Duration) -> Instant {
    match persisted {
        None => Instant::now() - interval,
        Some(ts) => {
            let elapsed = (Utc::now() - ts).to_std().unwrap_or(interval);
            if elapsed >= interval {
                Instant::now() - interval
            } else {
                Instant::now() - elapsed
            }
        }
    }
}

/// Periodically kicks off daily runs when the configured interval elapses.
pub struct JobsService {
    runner: JobRunner,
    pool: PgPool,
    statuses: ServiceStatusRegistry,
    interval: Duration,
}

impl JobsService {
    pub fn new(
        runner: JobRunner,
        pool: PgPool,
        statuses: ServiceStatusRegistry,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            pool,
            statuses,
            interval,
        }
    }
}

#[async_trait]
impl Service for JobsService {
    async fn run(self: Box<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Jobs service started");
        self.statuses.set("jobs", ServiceStatus::Active);

        // Load the persisted timestamp so restarts don't redo recent work.
        let persisted = kv::get_timestamp(&self.pool, KV_DAILY_RUN)
            .await
            .unwrap_or(None);
        if let Some(ts) = persisted {
            info!(last_daily_run = %ts, "Loaded persisted job timestamp");
        }
        let mut last_run = persisted_to_instant(persisted, self.interval);

        let wake_interval = Duration::from_secs(60);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Jobs service shutting down");
                    return;
                }
                _ = tokio::time::sleep(wake_interval) => {}
            }

            if last_run.elapsed() < self.interval {
                continue;
            }

            let cancel = CancellationToken::new();
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    // Drop the in-flight run; stage checks keep partial
                    // results out of the store.
                    cancel.cancel();
                    info!("Jobs service shutting down");
                    return;
                }
                result = self.runner.run_daily(&cancel) => match result {
                    Ok(_report) => {
                        last_run = Instant::now();
                        if let Err(e) = kv::set_timestamp(&self.pool, KV_DAILY_RUN, Utc::now()).await {
                            warn!(error = ?e, "Failed to persist daily-run timestamp");
                        }
                        self.statuses.set("jobs", ServiceStatus::Active);
                    }
                    Err(JobError::Cancelled) => return,
                    Err(e) => {
                        error!(error = %e, "Daily analytics run failed");
                        self.statuses.set("jobs", ServiceStatus::Error);
                    }
                }
            }
        }
    }
}
