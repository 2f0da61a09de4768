//! Web API router construction.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{jobs, schedules, status};

/// Creates the web server router.
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/schedules", get(schedules::list_schedules))
        .route("/schedules/{user_id}", get(schedules::get_schedule))
        .route("/jobs/daily", post(jobs::run_daily))
        .route("/jobs/backfill", post(jobs::run_backfill))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        // Triggered jobs can take a while; everything else is quick.
        TimeoutLayer::new(Duration::from_secs(120)),
    ))
}
