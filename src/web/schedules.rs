//! Resolved-schedule handlers.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;

use crate::engine::schedule::{ResolvedSchedule, ScheduleSource, weekday_short};
use crate::state::AppState;
use crate::web::error::{ApiError, job_error};

#[derive(Serialize)]
pub struct ScheduleView {
    user_id: i64,
    org_id: i64,
    team_id: i64,
    source: ScheduleSource,
    days: Vec<DayView>,
}

#[derive(Serialize)]
struct DayView {
    weekday: &'static str,
    start: String,
    end: String,
}

fn render(resolved: ResolvedSchedule) -> ScheduleView {
    let days = resolved
        .week
        .open_days()
        .map(|(day, window)| DayView {
            weekday: weekday_short(day),
            start: fmt_time_of_day(window.start_secs),
            end: fmt_time_of_day(window.end_secs),
        })
        .collect();
    ScheduleView {
        user_id: resolved.user_id,
        org_id: resolved.org_id,
        team_id: resolved.team_id,
        source: resolved.source,
        days,
    }
}

fn fmt_time_of_day(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `GET /api/schedules`: every bound principal's effective schedule.
pub(super) async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleView>>, ApiError> {
    let resolved = state
        .runner
        .resolved_schedules()
        .await
        .map_err(|e| job_error("Schedule resolution", e))?;
    Ok(Json(resolved.into_iter().map(render).collect()))
}

/// `GET /api/schedules/{user_id}`: one principal's effective schedule.
pub(super) async fn get_schedule(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ScheduleView>, ApiError> {
    let resolved = state
        .runner
        .resolved_schedules()
        .await
        .map_err(|e| job_error("Schedule resolution", e))?;

    resolved
        .into_iter()
        .find(|r| r.user_id == user_id)
        .map(|r| Json(render(r)))
        .ok_or_else(|| ApiError::not_found(format!("No binding for user {user_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schedule::{DayWindow, WeekSchedule};
    use chrono::Weekday;

    #[test]
    fn renders_open_days_with_wall_clock_times() {
        let resolved = ResolvedSchedule {
            user_id: 14024,
            org_id: 2,
            team_id: 9,
            source: ScheduleSource::Personal,
            week: WeekSchedule::closed().with_day(Weekday::Mon, DayWindow::new(10 * 3600, 12 * 3600)),
        };
        let view = render(resolved);
        assert_eq!(view.days.len(), 1);
        assert_eq!(view.days[0].weekday, "mon");
        assert_eq!(view.days[0].start, "10:00:00");
        assert_eq!(view.days[0].end, "12:00:00");
    }
}
