//! Working-interval arithmetic: how many seconds of an arbitrary `[t0, t1]`
//! instant range fall inside a weekly working-hours schedule.
//!
//! All civil-day and time-of-day reasoning happens in a single reference
//! timezone supplied by the caller; instants never mix zones within one
//! calculation. Windows are half-open `[start, end)` so consecutive days
//! never double-count midnight, and `end < start` windows wrap into the
//! following calendar day.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::engine::schedule::{DayWindow, WeekSchedule};

/// How a partial day is credited against its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// Credit the intersection of the interval with the day's window.
    Intersect,
    /// Legacy behavior: a partial day counts in full when it lies entirely
    /// inside the window, and as zero when it crosses either boundary.
    Containment,
}

/// Seconds of `[t0, t1]` that intersect the weekly schedule.
///
/// Returns 0 when `t0 >= t1`. Under [`ClipMode::Intersect`] the result is
/// non-negative, bounded by `t1 - t0`, and additive over any split point.
pub fn working_seconds(
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
    week: &WeekSchedule,
    tz: Tz,
    mode: ClipMode,
) -> i64 {
    if t0 >= t1 {
        return 0;
    }
    match mode {
        ClipMode::Intersect => intersect_seconds(t0, t1, week, tz),
        ClipMode::Containment => containment_seconds(t0, t1, week, tz),
    }
}

/// Union of per-day window intervals clipped to `[t0, t1)`.
///
/// The walk starts one day before `t0`'s civil date so an overnight window
/// opened the previous evening still contributes its morning spill. Windows
/// of adjacent days may overlap (a wrapped window running into an open day),
/// so overlapping clips are merged before summing.
fn intersect_seconds(t0: DateTime<Utc>, t1: DateTime<Utc>, week: &WeekSchedule, tz: Tz) -> i64 {
    let first_day = t0.with_timezone(&tz).date_naive();
    let last_day = t1.with_timezone(&tz).date_naive();
    let lo = t0.timestamp();
    let hi = t1.timestamp();

    let mut clipped: Vec<(i64, i64)> = Vec::new();
    let mut day = first_day.pred_opt().unwrap_or(first_day);
    while day <= last_day {
        if let Some(win) = week.window(day.weekday())
            && !win.is_empty()
            && let Some((ws, we)) = window_bounds(tz, day, win)
        {
            let start = ws.timestamp().max(lo);
            let end = we.timestamp().min(hi);
            if start < end {
                clipped.push((start, end));
            }
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    clipped.sort_unstable();
    let mut total = 0i64;
    let mut covered_until = i64::MIN;
    for (start, end) in clipped {
        let start = start.max(covered_until);
        if end > start {
            total += end - start;
            covered_until = end;
        }
    }
    total
}

/// The legacy day-walk: full-span-or-zero for the partial days, full window
/// length for every intermediate day.
fn containment_seconds(t0: DateTime<Utc>, t1: DateTime<Utc>, week: &WeekSchedule, tz: Tz) -> i64 {
    let first_day = t0.with_timezone(&tz).date_naive();
    let last_day = t1.with_timezone(&tz).date_naive();

    if first_day == last_day {
        return contained_span(tz, first_day, t0, t1, week);
    }

    let mut total = 0i64;

    // First partial day runs to the following local midnight.
    if let Some(next) = first_day.succ_opt() {
        if let Some(midnight) = local_instant(tz, next, 0) {
            total += contained_span(tz, first_day, t0, midnight, week);
        }

        // Intermediate days are covered end to end and credit their window
        // in full.
        let mut day = next;
        while day < last_day {
            if let Some(win) = week.window(day.weekday()) {
                total += i64::from(win.len_secs());
            }
            let Some(next) = day.succ_opt() else { break };
            day = next;
        }
    }

    // Last partial day runs from its local midnight.
    if let Some(midnight) = local_instant(tz, last_day, 0) {
        total += contained_span(tz, last_day, midnight, t1, week);
    }

    total
}

/// Length of `[start, end)` when it sits entirely inside `day`'s window,
/// zero otherwise.
fn contained_span(
    tz: Tz,
    day: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    week: &WeekSchedule,
) -> i64 {
    let Some(win) = week.window(day.weekday()) else {
        return 0;
    };
    if win.is_empty() {
        return 0;
    }
    let Some((ws, we)) = window_bounds(tz, day, win) else {
        return 0;
    };
    if start >= ws && end <= we {
        (end - start).num_seconds()
    } else {
        0
    }
}

/// Absolute `[start, end)` bounds of `day`'s window. A wrapped window ends
/// on the following calendar day. `None` when the local time does not exist
/// (DST gap); the day is then skipped rather than miscounted.
fn window_bounds(tz: Tz, day: NaiveDate, win: DayWindow) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_instant(tz, day, win.start_secs)?;
    let end = if win.wraps() {
        local_instant(tz, day.succ_opt()?, win.end_secs)?
    } else {
        local_instant(tz, day, win.end_secs)?
    };
    Some((start, end))
}

fn local_instant(tz: Tz, day: NaiveDate, secs_from_midnight: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs_from_midnight, 0)?;
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.to_utc())
}
