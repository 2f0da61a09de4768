//! Full scans of the working-hours configuration tables.
//!
//! Both tables are small (a handful of rows per org), so each run reads
//! them whole and resolution happens in memory. Scan order is pinned by
//! primary key so the first-binding-wins dedup rule is deterministic.

use anyhow::Result;
use sqlx::PgPool;

use crate::engine::schedule::{ScheduleEntry, UserBinding};

/// One raw `working_hours` row. Times stay text here: a malformed value
/// must reach the resolver so it can warn and drop just that weekday.
#[derive(sqlx::FromRow, Debug)]
struct WorkingHoursRow {
    scope: String,
    scope_id: i64,
    weekday: String,
    start_time_utc: String,
    end_time_utc: String,
}

#[derive(sqlx::FromRow, Debug)]
struct UserBindingRow {
    user_id: i64,
    team_id: i64,
    org_id: i64,
}

/// Fetch every schedule row, in insertion order.
pub async fn list_schedule_entries(pool: &PgPool) -> Result<Vec<ScheduleEntry>> {
    let rows = sqlx::query_as::<_, WorkingHoursRow>(
        "SELECT scope, scope_id, weekday, start_time_utc, end_time_utc \
         FROM working_hours ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ScheduleEntry {
            scope: row.scope,
            scope_id: row.scope_id,
            weekday: row.weekday,
            start_time: row.start_time_utc,
            end_time: row.end_time_utc,
        })
        .collect())
}

/// Fetch every user binding, in insertion order.
pub async fn list_user_bindings(pool: &PgPool) -> Result<Vec<UserBinding>> {
    let rows = sqlx::query_as::<_, UserBindingRow>(
        "SELECT user_id, team_id, org_id FROM user_bindings ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| UserBinding {
            user_id: row.user_id,
            team_id: row.team_id,
            org_id: row.org_id,
        })
        .collect())
}
