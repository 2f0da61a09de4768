//! Queries against the append-only `message_events` store.
//!
//! Rows stream out of the database ordered by `(chat_id, message_timestamp,
//! event_id)` and are converted one at a time; a row with an unknown
//! direction is logged and skipped rather than failing the batch.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::PgPool;
use tracing::warn;

use crate::engine::segment::{Direction, MessageEvent};

#[derive(sqlx::FromRow, Debug)]
struct EventRow {
    event_id: i64,
    message_id: String,
    chat_id: String,
    user_id: i64,
    org_id: i64,
    agent_phone_number: String,
    sender_number: String,
    direction: String,
    message_timestamp: DateTime<Utc>,
    ingestion_timestamp: DateTime<Utc>,
}

const EVENT_SELECT: &str = "SELECT event_id, message_id, chat_id, user_id, org_id, \
     agent_phone_number, sender_number, direction, message_timestamp, ingestion_timestamp \
     FROM message_events";

const EVENT_ORDER: &str = "ORDER BY chat_id, message_timestamp, event_id";

/// Events ingested within the trailing window, for the daily pipeline.
pub async fn list_recent(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<MessageEvent>> {
    let query = format!("{EVENT_SELECT} WHERE ingestion_timestamp >= $1 {EVENT_ORDER}");
    let mut stream = sqlx::query_as::<_, EventRow>(&query).bind(since).fetch(pool);

    let mut events = Vec::new();
    while let Some(row) = stream.try_next().await? {
        if let Some(event) = convert(row) {
            events.push(event);
        }
    }
    Ok(events)
}

/// Every event for one user, for the lifetime backfill pipeline.
pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<MessageEvent>> {
    let query = format!("{EVENT_SELECT} WHERE user_id = $1 {EVENT_ORDER}");
    let mut stream = sqlx::query_as::<_, EventRow>(&query).bind(user_id).fetch(pool);

    let mut events = Vec::new();
    while let Some(row) = stream.try_next().await? {
        if let Some(event) = convert(row) {
            events.push(event);
        }
    }
    Ok(events)
}

fn convert(row: EventRow) -> Option<MessageEvent> {
    let direction = match Direction::parse(&row.direction) {
        Ok(direction) => direction,
        Err(e) => {
            warn!(event_id = row.event_id, error = %e, "skipping event row");
            return None;
        }
    };
    Some(MessageEvent {
        event_id: row.event_id,
        message_id: row.message_id,
        chat_id: row.chat_id,
        user_id: row.user_id,
        org_id: row.org_id,
        agent_phone_number: row.agent_phone_number,
        sender_number: row.sender_number,
        direction,
        message_timestamp: row.message_timestamp,
        ingestion_timestamp: row.ingestion_timestamp,
    })
}
