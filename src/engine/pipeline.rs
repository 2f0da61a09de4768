//! The pure pipeline: ordered events in, deterministic upsert plans out.
//!
//! Both pipelines share the same stages (partition, segment, aggregate,
//! plan) and differ only in partition key and target table. Partitions are
//! independent, so their processing order cannot affect the resulting plan
//! (plans carry a canonical row order).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::engine::aggregate::{ResponseMetrics, response_metrics};
use crate::engine::plan::{DailyRow, LifetimeRow, SummaryValues, UpsertPlan};
use crate::engine::schedule::WeekSchedule;
use crate::engine::segment::{ConversationFacts, MessageEvent, chat_order, segment};
use crate::engine::working_time::ClipMode;

/// Summary of a completed job run, logged and returned to HTTP callers.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub kind: &'static str,
    pub events_read: usize,
    pub rows_planned: usize,
    pub rows_upserted: u64,
    pub duration_ms: u64,
    pub legacy_clipping: bool,
}

/// Build the lifetime plan: one `conversation_summary` row per
/// `(user, org, chat)` over the full event history supplied.
pub fn build_lifetime_plan(
    events: Vec<MessageEvent>,
    schedules: &HashMap<i64, WeekSchedule>,
    tz: Tz,
    mode: ClipMode,
    job_time: DateTime<Utc>,
) -> UpsertPlan {
    let mut rows = Vec::new();
    for ((user_id, org_id, chat_id), events) in partition(events, |_| None) {
        let phone = events[0].agent_phone_number.clone();
        let (facts, metrics) = compute(&events, schedules, user_id, tz, mode);
        // Lifetime rows date their creation from the conversation itself.
        let created_at = events[0].message_timestamp;
        rows.push(LifetimeRow {
            user_id,
            org_id,
            chat_id,
            agent_phone_number: phone,
            values: summary_values(&facts, &metrics, created_at, job_time),
        });
    }
    UpsertPlan::new(rows, Vec::new())
}

/// Build the daily plan: one `daily_performance_summary` row per
/// `(user, org, chat, civil day)`, days taken in the reference zone.
pub fn build_daily_plan(
    events: Vec<MessageEvent>,
    schedules: &HashMap<i64, WeekSchedule>,
    tz: Tz,
    mode: ClipMode,
    job_time: DateTime<Utc>,
) -> UpsertPlan {
    let mut rows = Vec::new();
    for ((user_id, org_id, chat_id), events) in
        partition(events, |e| Some(e.message_timestamp.with_timezone(&tz).date_naive()))
    {
        let activity_date = events[0]
            .message_timestamp
            .with_timezone(&tz)
            .date_naive();
        let phone = events[0].agent_phone_number.clone();
        let (facts, metrics) = compute(&events, schedules, user_id, tz, mode);
        rows.push(DailyRow {
            activity_date,
            user_id,
            org_id,
            chat_id,
            agent_phone_number: phone,
            values: summary_values(&facts, &metrics, job_time, job_time),
        });
    }
    UpsertPlan::new(Vec::new(), rows)
}

type PartitionKey = (i64, i64, String);

/// Group events into ordered partitions. The optional `day_of` function
/// splits partitions further by civil day for the daily pipeline. Events
/// inside each partition come out in chat order (timestamp, then event id).
fn partition(
    mut events: Vec<MessageEvent>,
    day_of: impl Fn(&MessageEvent) -> Option<NaiveDate>,
) -> Vec<(PartitionKey, Vec<MessageEvent>)> {
    events.sort_by(chat_order);

    let mut partitions: BTreeMap<(i64, i64, String, Option<NaiveDate>), Vec<MessageEvent>> =
        BTreeMap::new();
    for event in events {
        let key = (
            event.user_id,
            event.org_id,
            event.chat_id.clone(),
            day_of(&event),
        );
        partitions.entry(key).or_default().push(event);
    }

    partitions
        .into_iter()
        .map(|((user_id, org_id, chat_id, _), events)| ((user_id, org_id, chat_id), events))
        .collect()
}

fn compute(
    events: &[MessageEvent],
    schedules: &HashMap<i64, WeekSchedule>,
    user_id: i64,
    tz: Tz,
    mode: ClipMode,
) -> (ConversationFacts, ResponseMetrics) {
    let week = schedules
        .get(&user_id)
        .cloned()
        .unwrap_or_else(WeekSchedule::default_hours);
    let facts = segment(events);
    let metrics = response_metrics(&facts, &week, tz, mode);
    (facts, metrics)
}

fn summary_values(
    facts: &ConversationFacts,
    metrics: &ResponseMetrics,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> SummaryValues {
    SummaryValues {
        conversation_starter: facts.starter.map(|d| d.participant()),
        last_message_from: facts.last.map(|d| d.participant()),
        contact_message_count: facts.contact_message_count as i32,
        agent_message_count: facts.agent_message_count as i32,
        unique_message_count: facts.unique_message_count as i32,
        follow_up_count: facts.follow_up_count as i32,
        average_response_secs: metrics.average_response_secs,
        first_response_secs: metrics.first_response_secs,
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schedule::DayWindow;
    use crate::engine::segment::Direction;
    use chrono::{TimeZone, Weekday};

    fn weekdays_nine_to_six() -> WeekSchedule {
        let window = DayWindow::new(9 * 3600, 18 * 3600);
        WeekSchedule::closed()
            .with_day(Weekday::Mon, window)
            .with_day(Weekday::Tue, window)
            .with_day(Weekday::Wed, window)
            .with_day(Weekday::Thu, window)
            .with_day(Weekday::Fri, window)
    }

    fn event(
        event_id: i64,
        chat_id: &str,
        direction: Direction,
        day: u32,
        h: u32,
        m: u32,
    ) -> MessageEvent {
        let ts = Utc.with_ymd_and_hms(2025, 1, day, h, m, 0).unwrap();
        MessageEvent {
            event_id,
            message_id: format!("m{event_id}"),
            chat_id: chat_id.to_string(),
            user_id: 14024,
            org_id: 2,
            agent_phone_number: "+15550100".to_string(),
            sender_number: "+15550199".to_string(),
            direction,
            message_timestamp: ts,
            ingestion_timestamp: ts,
        }
    }

    fn schedules() -> HashMap<i64, WeekSchedule> {
        HashMap::from([(14024, weekdays_nine_to_six())])
    }

    fn job_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 3, 0, 0).unwrap()
    }

    #[test]
    fn lifetime_plan_rolls_whole_chats() {
        // Monday 2025-01-06: IN 09:00, OUT 09:05, IN 09:30, OUT 09:32,
        // IN 20:00; Tuesday: OUT 10:00.
        let events = vec![
            event(1, "chat-1", Direction::Incoming, 6, 9, 0),
            event(2, "chat-1", Direction::Outgoing, 6, 9, 5),
            event(3, "chat-1", Direction::Incoming, 6, 9, 30),
            event(4, "chat-1", Direction::Outgoing, 6, 9, 32),
            event(5, "chat-1", Direction::Incoming, 6, 20, 0),
            event(6, "chat-1", Direction::Outgoing, 7, 10, 0),
        ];

        let plan = build_lifetime_plan(
            events,
            &schedules(),
            chrono_tz::UTC,
            ClipMode::Intersect,
            job_time(),
        );
        assert_eq!(plan.lifetime.len(), 1);
        assert!(plan.daily.is_empty());

        let row = &plan.lifetime[0];
        assert_eq!(row.user_id, 14024);
        assert_eq!(row.chat_id, "chat-1");
        assert_eq!(row.values.conversation_starter, Some("contact"));
        assert_eq!(row.values.last_message_from, Some("employee"));
        assert_eq!(row.values.contact_message_count, 3);
        assert_eq!(row.values.agent_message_count, 3);
        assert_eq!(row.values.average_response_secs, (300.0 + 120.0 + 3600.0) / 3.0);
        assert_eq!(row.values.first_response_secs, Some(300));
        // Created when the conversation started, updated at the job time.
        assert_eq!(
            row.values.created_at,
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
        );
        assert_eq!(row.values.updated_at, job_time());
    }

    #[test]
    fn daily_plan_splits_partitions_by_civil_day() {
        let events = vec![
            event(1, "chat-1", Direction::Incoming, 6, 9, 0),
            event(2, "chat-1", Direction::Outgoing, 6, 9, 5),
            event(3, "chat-1", Direction::Incoming, 7, 11, 0),
            event(4, "chat-1", Direction::Outgoing, 7, 11, 2),
        ];

        let plan = build_daily_plan(
            events,
            &schedules(),
            chrono_tz::UTC,
            ClipMode::Intersect,
            job_time(),
        );
        assert_eq!(plan.daily.len(), 2);
        assert_eq!(
            plan.daily[0].activity_date,
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
        );
        assert_eq!(
            plan.daily[1].activity_date,
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()
        );
        assert_eq!(plan.daily[0].values.average_response_secs, 300.0);
        assert_eq!(plan.daily[1].values.average_response_secs, 120.0);
        // Daily rows are created and updated at the job time.
        assert_eq!(plan.daily[0].values.created_at, job_time());
    }

    #[test]
    fn unsorted_input_produces_identical_plans() {
        let sorted = vec![
            event(1, "chat-1", Direction::Incoming, 6, 9, 0),
            event(2, "chat-1", Direction::Outgoing, 6, 9, 5),
            event(3, "chat-2", Direction::Incoming, 6, 10, 0),
            event(4, "chat-2", Direction::Outgoing, 6, 10, 4),
        ];
        let mut shuffled = sorted.clone();
        shuffled.reverse();

        let a = build_lifetime_plan(
            sorted,
            &schedules(),
            chrono_tz::UTC,
            ClipMode::Intersect,
            job_time(),
        );
        let b = build_lifetime_plan(
            shuffled,
            &schedules(),
            chrono_tz::UTC,
            ClipMode::Intersect,
            job_time(),
        );
        assert_eq!(a, b);
        assert_eq!(a.lifetime.len(), 2);
    }

    #[test]
    fn users_without_schedules_fall_back_to_default_hours() {
        let mut events = vec![
            event(1, "chat-9", Direction::Incoming, 6, 10, 0),
            event(2, "chat-9", Direction::Outgoing, 6, 10, 10),
        ];
        for e in &mut events {
            e.user_id = 999;
        }
        let plan = build_lifetime_plan(
            events,
            &schedules(),
            chrono_tz::UTC,
            ClipMode::Intersect,
            job_time(),
        );
        // 10:00-10:10 sits inside the built-in 09:00-18:00 default.
        assert_eq!(plan.lifetime[0].values.average_response_secs, 600.0);
    }
}
