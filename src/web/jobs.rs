//! Job trigger handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::pipeline::JobReport;
use crate::state::AppState;
use crate::web::error::{ApiError, ApiErrorCode, job_error};

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    pub user_id: i64,
    pub org_id: i64,
    #[serde(default)]
    pub use_simple: bool,
}

/// `POST /api/jobs/daily`: run the daily pipeline now and return its report.
pub(super) async fn run_daily(State(state): State<AppState>) -> Result<Json<JobReport>, ApiError> {
    info!("daily run triggered via API");
    // On-demand runs are never cancelled; the token only feeds the
    // runner's stage checks.
    let cancel = CancellationToken::new();
    let report = state
        .runner
        .run_daily(&cancel)
        .await
        .map_err(|e| job_error("Daily run", e))?;
    Ok(Json(report))
}

/// `POST /api/jobs/backfill`: re-aggregate one user's conversations.
pub(super) async fn run_backfill(
    State(state): State<AppState>,
    Json(request): Json<BackfillRequest>,
) -> Result<Json<JobReport>, ApiError> {
    if request.user_id <= 0 || request.org_id <= 0 {
        return Err(ApiError::new(
            ApiErrorCode::InvalidRequest,
            "user_id and org_id must be positive",
        ));
    }

    let binding = state
        .runner
        .find_binding(request.user_id)
        .await
        .map_err(|e| job_error("Binding lookup", e))?
        .ok_or_else(|| ApiError::not_found(format!("No binding for user {}", request.user_id)))?;

    info!(
        user_id = request.user_id,
        org_id = request.org_id,
        use_simple = request.use_simple,
        "backfill triggered via API"
    );
    let cancel = CancellationToken::new();
    let report = state
        .runner
        .run_backfill(binding, request.org_id, request.use_simple, &cancel)
        .await
        .map_err(|e| job_error("Backfill run", e))?;
    Ok(Json(report))
}
