//! End-to-end scenarios over the pure pipeline: schedule rows and raw
//! events in, deterministic upsert plans out.

use std::collections::HashMap;

use chatmetrics::engine::pipeline::{build_daily_plan, build_lifetime_plan};
use chatmetrics::engine::schedule::{
    ScheduleEntry, ScheduleSource, UserBinding, resolve_for, resolve_schedules,
};
use chatmetrics::engine::segment::{Direction, MessageEvent};
use chatmetrics::engine::working_time::{ClipMode, working_seconds};
use chrono::{DateTime, TimeZone, Utc};

fn entry(scope: &str, scope_id: i64, weekday: &str, start: &str, end: &str) -> ScheduleEntry {
    ScheduleEntry {
        scope: scope.to_string(),
        scope_id,
        weekday: weekday.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

/// Mon-Fri 09:00-18:00 for the given scope.
fn weekday_entries(scope: &str, scope_id: i64) -> Vec<ScheduleEntry> {
    ["mon", "tue", "wed", "thu", "fri"]
        .iter()
        .map(|day| entry(scope, scope_id, day, "09:00:00", "18:00:00"))
        .collect()
}

fn event(
    event_id: i64,
    chat_id: &str,
    user_id: i64,
    direction: Direction,
    ts: DateTime<Utc>,
) -> MessageEvent {
    MessageEvent {
        event_id,
        message_id: format!("wamid-{event_id}"),
        chat_id: chat_id.to_string(),
        user_id,
        org_id: 2,
        agent_phone_number: "+15550100".to_string(),
        sender_number: "+15550199".to_string(),
        direction,
        message_timestamp: ts,
        ingestion_timestamp: ts + chrono::Duration::seconds(2),
    }
}

fn mon(h: u32, m: u32) -> DateTime<Utc> {
    // 2025-01-06 is a Monday.
    Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap()
}

fn tue(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 7, h, m, 0).unwrap()
}

fn job_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 8, 3, 15, 0).unwrap()
}

#[test]
fn personal_schedule_wins_and_drives_the_calculator() {
    // User 14024 (team 9, org 2) has a personal Monday 10:00-12:00 row.
    // Team covers Mon-Fri and org covers the whole week, but neither may
    // bleed into the resolved schedule.
    let mut entries = vec![entry("self", 14024, "mon", "10:00:00", "12:00:00")];
    entries.extend(weekday_entries("team", 9));
    for day in ["mon", "tue", "wed", "thu", "fri", "sat", "sun"] {
        entries.push(entry("org", 2, day, "00:00:00", "23:59:00"));
    }

    let binding = UserBinding {
        user_id: 14024,
        team_id: 9,
        org_id: 2,
    };
    let resolved = resolve_for(&entries, binding);
    assert_eq!(resolved.source, ScheduleSource::Personal);

    // Tuesday is closed for this user even though team and org are open.
    let tuesday_hours = working_seconds(
        tue(9, 0),
        tue(18, 0),
        &resolved.week,
        chrono_tz::UTC,
        ClipMode::Intersect,
    );
    assert_eq!(tuesday_hours, 0);

    // Monday only credits the personal 10:00-12:00 window.
    let monday_hours = working_seconds(
        mon(8, 0),
        mon(20, 0),
        &resolved.week,
        chrono_tz::UTC,
        ClipMode::Intersect,
    );
    assert_eq!(monday_hours, 2 * 3600);
}

#[test]
fn lifetime_rollup_matches_both_calculation_modes() {
    // Mon 09:00 IN, 09:05 OUT, 09:30 IN, 09:32 OUT, 20:00 IN, Tue 10:00 OUT
    // under Mon-Fri 09:00-18:00.
    let events: Vec<MessageEvent> = vec![
        event(1, "chat-1", 14024, Direction::Incoming, mon(9, 0)),
        event(2, "chat-1", 14024, Direction::Outgoing, mon(9, 5)),
        event(3, "chat-1", 14024, Direction::Incoming, mon(9, 30)),
        event(4, "chat-1", 14024, Direction::Outgoing, mon(9, 32)),
        event(5, "chat-1", 14024, Direction::Incoming, mon(20, 0)),
        event(6, "chat-1", 14024, Direction::Outgoing, tue(10, 0)),
    ];

    let resolved = resolve_for(
        &weekday_entries("self", 14024),
        UserBinding {
            user_id: 14024,
            team_id: 9,
            org_id: 2,
        },
    );
    let schedules = HashMap::from([(14024, resolved.week)]);

    // Correct clipping: the overnight pair contributes Tue 09:00-10:00.
    let plan = build_lifetime_plan(
        events.clone(),
        &schedules,
        chrono_tz::UTC,
        ClipMode::Intersect,
        job_time(),
    );
    assert_eq!(plan.lifetime.len(), 1);
    let row = &plan.lifetime[0];
    assert_eq!(row.values.contact_message_count, 3);
    assert_eq!(row.values.agent_message_count, 3);
    assert_eq!(row.values.unique_message_count, 6);
    assert_eq!(row.values.conversation_starter, Some("contact"));
    assert_eq!(row.values.last_message_from, Some("employee"));
    assert_eq!(
        row.values.average_response_secs,
        (300.0 + 120.0 + 3600.0) / 3.0
    );
    assert_eq!(row.values.first_response_secs, Some(300));

    // Legacy clipping: the overnight pair is dropped from the mean.
    let legacy = build_lifetime_plan(
        events,
        &schedules,
        chrono_tz::UTC,
        ClipMode::Containment,
        job_time(),
    );
    assert_eq!(
        legacy.lifetime[0].values.average_response_secs,
        (300.0 + 120.0) / 2.0
    );
}

#[test]
fn daily_rollup_splits_days_and_users() {
    let events: Vec<MessageEvent> = vec![
        event(1, "chat-1", 14024, Direction::Incoming, mon(9, 0)),
        event(2, "chat-1", 14024, Direction::Outgoing, mon(9, 5)),
        event(3, "chat-1", 14024, Direction::Incoming, tue(11, 0)),
        event(4, "chat-1", 14024, Direction::Outgoing, tue(11, 2)),
        event(5, "chat-7", 15000, Direction::Outgoing, mon(14, 0)),
        event(6, "chat-7", 15000, Direction::Outgoing, mon(14, 1)),
    ];

    let bindings = vec![
        UserBinding {
            user_id: 14024,
            team_id: 9,
            org_id: 2,
        },
        UserBinding {
            user_id: 15000,
            team_id: 9,
            org_id: 2,
        },
    ];
    let resolved = resolve_schedules(&weekday_entries("team", 9), &bindings);
    let schedules: HashMap<i64, _> = resolved.into_iter().map(|r| (r.user_id, r.week)).collect();

    let plan = build_daily_plan(
        events,
        &schedules,
        chrono_tz::UTC,
        ClipMode::Intersect,
        job_time(),
    );

    // Two days for chat-1 plus one day for chat-7.
    assert_eq!(plan.daily.len(), 3);

    let first = &plan.daily[0];
    assert_eq!(first.user_id, 14024);
    assert_eq!(first.values.average_response_secs, 300.0);

    // The agent-only chat started and ended with the employee and has one
    // follow-up, no response pairs.
    let agent_only = plan
        .daily
        .iter()
        .find(|r| r.user_id == 15000)
        .expect("chat-7 row");
    assert_eq!(agent_only.values.conversation_starter, Some("employee"));
    assert_eq!(agent_only.values.follow_up_count, 1);
    assert_eq!(agent_only.values.average_response_secs, 0.0);
    assert_eq!(agent_only.values.first_response_secs, None);
}

#[test]
fn replanning_the_same_batch_is_byte_identical() {
    let events: Vec<MessageEvent> = vec![
        event(1, "chat-1", 14024, Direction::Incoming, mon(9, 0)),
        event(2, "chat-1", 14024, Direction::Outgoing, mon(9, 5)),
        event(3, "chat-2", 14024, Direction::Incoming, mon(10, 0)),
        event(4, "chat-2", 14024, Direction::Outgoing, mon(10, 30)),
    ];
    let resolved = resolve_for(
        &weekday_entries("self", 14024),
        UserBinding {
            user_id: 14024,
            team_id: 9,
            org_id: 2,
        },
    );
    let schedules = HashMap::from([(14024, resolved.week)]);

    let first = build_daily_plan(
        events.clone(),
        &schedules,
        chrono_tz::UTC,
        ClipMode::Intersect,
        job_time(),
    );
    let second = build_daily_plan(
        events,
        &schedules,
        chrono_tz::UTC,
        ClipMode::Intersect,
        job_time(),
    );
    assert_eq!(first, second);
}
