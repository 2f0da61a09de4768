//! Weekly working-hours schedules and their per-principal resolution.
//!
//! A schedule is an ordered 7-slot array (Monday..Sunday) of optional
//! `[start, end)` second-of-day windows, so weekday arithmetic is plain
//! mod-7 indexing rather than string lookups. Resolution picks the
//! highest-priority scope (`self > team > org > default`) that has *any*
//! rows for a principal; scopes are never merged per-weekday.

use chrono::Weekday;
use serde::Serialize;
use tracing::warn;

use crate::engine::error::DataQualityError;

pub const SECS_PER_DAY: u32 = 24 * 60 * 60;

/// Built-in fallback window applied to every day when no scope has rows.
const DEFAULT_START_SECS: u32 = 9 * 3600;
const DEFAULT_END_SECS: u32 = 18 * 3600;

/// A single day's working window in seconds since local midnight.
///
/// `end < start` denotes an overnight window that spills into the next
/// calendar day. `start == end` is an empty window and contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub start_secs: u32,
    pub end_secs: u32,
}

impl DayWindow {
    pub fn new(start_secs: u32, end_secs: u32) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    /// True when the window crosses midnight into the following day.
    pub fn wraps(&self) -> bool {
        self.end_secs < self.start_secs
    }

    pub fn is_empty(&self) -> bool {
        self.start_secs == self.end_secs
    }

    /// Total seconds the window spans, accounting for overnight wrap.
    pub fn len_secs(&self) -> u32 {
        if self.wraps() {
            SECS_PER_DAY - (self.start_secs - self.end_secs)
        } else {
            self.end_secs - self.start_secs
        }
    }
}

/// Which scope a resolved schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    #[serde(rename = "self")]
    Personal,
    Team,
    Org,
    Default,
}

/// Effective weekly schedule: one optional window per weekday, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekSchedule {
    days: [Option<DayWindow>; 7],
}

impl WeekSchedule {
    pub fn closed() -> Self {
        Self { days: [None; 7] }
    }

    /// The built-in default: 09:00-18:00 every day of the week.
    pub fn default_hours() -> Self {
        Self {
            days: [Some(DayWindow::new(DEFAULT_START_SECS, DEFAULT_END_SECS)); 7],
        }
    }

    pub fn with_day(mut self, day: Weekday, window: DayWindow) -> Self {
        self.days[weekday_index(day)] = Some(window);
        self
    }

    /// The window assigned to `day`, if the day is open.
    pub fn window(&self, day: Weekday) -> Option<DayWindow> {
        self.days[weekday_index(day)]
    }

    /// Iterate `(weekday, window)` pairs Monday..Sunday for open days.
    pub fn open_days(&self) -> impl Iterator<Item = (Weekday, DayWindow)> + '_ {
        self.days
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.map(|w| (weekday_from_index(i), w)))
    }
}

/// Fixed weekday numbering at the component boundary: Monday = 0 .. Sunday = 6.
///
/// Chrono's `num_days_from_monday()` happens to match, but the mapping is
/// tabulated explicitly so it can never drift with a library change.
pub fn weekday_index(day: Weekday) -> usize {
    match day {
        Weekday::Mon => 0,
        Weekday::Tue => 1,
        Weekday::Wed => 2,
        Weekday::Thu => 3,
        Weekday::Fri => 4,
        Weekday::Sat => 5,
        Weekday::Sun => 6,
    }
}

pub fn weekday_from_index(index: usize) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// The storage representation (`mon`..`sun`) of a weekday.
pub fn weekday_short(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Parse the storage representation (`mon`..`sun`) of a weekday.
pub fn parse_weekday(s: &str) -> Result<Weekday, DataQualityError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => Err(DataQualityError::UnknownWeekday(other.to_string())),
    }
}

/// Parse a wall-clock time (`HH:MM:SS`, seconds optional) to seconds since
/// midnight.
pub fn parse_time_of_day(s: &str) -> Result<u32, DataQualityError> {
    let malformed = || DataQualityError::MalformedTime(s.to_string());

    let mut parts = s.trim().split(':');
    let hours: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let minutes: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(malformed)?;
    let seconds: u32 = match parts.next() {
        Some(p) => p.parse().map_err(|_| malformed())?,
        None => 0,
    };
    if parts.next().is_some() || hours >= 24 || minutes >= 60 || seconds >= 60 {
        return Err(malformed());
    }
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// One raw row of the `working_hours` table.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub scope: String,
    pub scope_id: i64,
    pub weekday: String,
    pub start_time: String,
    pub end_time: String,
}

/// One raw row of the `user_bindings` table.
#[derive(Debug, Clone, Copy)]
pub struct UserBinding {
    pub user_id: i64,
    pub team_id: i64,
    pub org_id: i64,
}

/// The effective schedule for one principal, with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSchedule {
    pub user_id: i64,
    pub org_id: i64,
    pub team_id: i64,
    pub source: ScheduleSource,
    pub week: WeekSchedule,
}

/// Build a weekly schedule out of the rows of a single scope.
///
/// Rows with an unparseable weekday or time mark nothing and are logged;
/// a `00:00:00-00:00:00` row is an explicit closed day and leaves the
/// weekday absent. `end < start` is an overnight window, not an error.
/// When a weekday appears more than once the last row wins.
fn build_week(entries: &[&ScheduleEntry]) -> WeekSchedule {
    let mut week = WeekSchedule::closed();
    for entry in entries {
        let day = match parse_weekday(&entry.weekday) {
            Ok(day) => day,
            Err(e) => {
                warn!(scope = %entry.scope, scope_id = entry.scope_id, error = %e, "skipping schedule row");
                continue;
            }
        };
        let parsed = parse_time_of_day(&entry.start_time)
            .and_then(|start| parse_time_of_day(&entry.end_time).map(|end| (start, end)));
        let (start, end) = match parsed {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!(
                    scope = %entry.scope,
                    scope_id = entry.scope_id,
                    weekday = %entry.weekday,
                    error = %e,
                    "marking weekday absent"
                );
                week.days[weekday_index(day)] = None;
                continue;
            }
        };
        let window = DayWindow::new(start, end);
        if window.is_empty() {
            // Closed-day marker (00:00:00-00:00:00) and zero-length windows
            // both contribute nothing; treat the day as absent.
            continue;
        }
        week = week.with_day(day, window);
    }
    week
}

/// Resolve effective schedules for every principal.
///
/// Bindings are deduplicated by `user_id` (first row wins). For each
/// principal the first scope in `self > team > org` order that has any rows
/// is used in full; the built-in 09:00-18:00 week applies when none do.
pub fn resolve_schedules(
    entries: &[ScheduleEntry],
    bindings: &[UserBinding],
) -> Vec<ResolvedSchedule> {
    let mut seen = std::collections::HashSet::new();
    let mut resolved = Vec::new();

    for binding in bindings {
        if !seen.insert(binding.user_id) {
            continue;
        }
        resolved.push(resolve_for(entries, *binding));
    }
    resolved
}

/// Resolve the effective schedule for a single principal.
pub fn resolve_for(entries: &[ScheduleEntry], binding: UserBinding) -> ResolvedSchedule {
    let candidates = [
        ("self", binding.user_id, ScheduleSource::Personal),
        ("team", binding.team_id, ScheduleSource::Team),
        ("org", binding.org_id, ScheduleSource::Org),
    ];

    for (scope, scope_id, source) in candidates {
        let matching: Vec<&ScheduleEntry> = entries
            .iter()
            .filter(|e| e.scope == scope && e.scope_id == scope_id)
            .collect();
        if !matching.is_empty() {
            return ResolvedSchedule {
                user_id: binding.user_id,
                org_id: binding.org_id,
                team_id: binding.team_id,
                source,
                week: build_week(&matching),
            };
        }
    }

    ResolvedSchedule {
        user_id: binding.user_id,
        org_id: binding.org_id,
        team_id: binding.team_id,
        source: ScheduleSource::Default,
        week: WeekSchedule::default_hours(),
    }
}
