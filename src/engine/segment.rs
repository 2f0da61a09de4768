//! Conversation segmentation: turning an ordered stream of directional
//! message events into response pairs and per-conversation facts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::error::DataQualityError;

/// Message direction relative to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// Parse the storage representation (`INCOMING`/`OUTGOING`).
    pub fn parse(s: &str) -> Result<Self, DataQualityError> {
        match s {
            "INCOMING" => Ok(Direction::Incoming),
            "OUTGOING" => Ok(Direction::Outgoing),
            other => Err(DataQualityError::UnknownDirection(other.to_string())),
        }
    }

    /// The participant label used in the aggregate tables.
    pub fn participant(self) -> &'static str {
        match self {
            Direction::Outgoing => "employee",
            Direction::Incoming => "contact",
        }
    }
}

/// One immutable message event, typed at the store boundary.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub event_id: i64,
    pub message_id: String,
    pub chat_id: String,
    pub user_id: i64,
    pub org_id: i64,
    pub agent_phone_number: String,
    pub sender_number: String,
    pub direction: Direction,
    pub message_timestamp: DateTime<Utc>,
    pub ingestion_timestamp: DateTime<Utc>,
}

/// An adjacent incoming -> outgoing pair within one chat's chronological
/// order: a customer message and the agent reply that answered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePair {
    pub incoming_ts: DateTime<Utc>,
    pub outgoing_ts: DateTime<Utc>,
}

/// Everything the aggregator needs to know about one partition of events.
#[derive(Debug, Clone, Default)]
pub struct ConversationFacts {
    pub starter: Option<Direction>,
    pub last: Option<Direction>,
    pub contact_message_count: u32,
    pub agent_message_count: u32,
    pub unique_message_count: u32,
    pub follow_up_count: u32,
    pub first_contact_ts: Option<DateTime<Utc>>,
    pub first_agent_ts: Option<DateTime<Utc>>,
    pub response_pairs: Vec<ResponsePair>,
}

/// Total event order within a chat: message timestamp, ties broken by
/// event id.
pub fn chat_order(a: &MessageEvent, b: &MessageEvent) -> std::cmp::Ordering {
    a.message_timestamp
        .cmp(&b.message_timestamp)
        .then(a.event_id.cmp(&b.event_id))
}

/// Derive conversation facts from one partition's events.
///
/// `events` must already be in chat order; a response pair exists exactly
/// at each adjacency where an incoming event is immediately followed by an
/// outgoing one, and a follow-up at each outgoing -> outgoing adjacency.
pub fn segment(events: &[MessageEvent]) -> ConversationFacts {
    let mut facts = ConversationFacts {
        starter: events.first().map(|e| e.direction),
        last: events.last().map(|e| e.direction),
        ..ConversationFacts::default()
    };

    let mut message_ids: HashSet<&str> = HashSet::new();
    let mut previous: Option<&MessageEvent> = None;

    for event in events {
        message_ids.insert(event.message_id.as_str());
        match event.direction {
            Direction::Incoming => {
                facts.contact_message_count += 1;
                if facts.first_contact_ts.is_none() {
                    facts.first_contact_ts = Some(event.message_timestamp);
                }
            }
            Direction::Outgoing => {
                facts.agent_message_count += 1;
                if facts.first_agent_ts.is_none() {
                    facts.first_agent_ts = Some(event.message_timestamp);
                }
            }
        }

        if let Some(prev) = previous {
            match (prev.direction, event.direction) {
                (Direction::Incoming, Direction::Outgoing) => {
                    facts.response_pairs.push(ResponsePair {
                        incoming_ts: prev.message_timestamp,
                        outgoing_ts: event.message_timestamp,
                    });
                }
                (Direction::Outgoing, Direction::Outgoing) => {
                    facts.follow_up_count += 1;
                }
                _ => {}
            }
        }
        previous = Some(event);
    }

    facts.unique_message_count = message_ids.len() as u32;
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(event_id: i64, message_id: &str, direction: Direction, minute: u32) -> MessageEvent {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 9, minute, 0).unwrap();
        MessageEvent {
            event_id,
            message_id: message_id.to_string(),
            chat_id: "chat-1".to_string(),
            user_id: 14024,
            org_id: 2,
            agent_phone_number: "+15550100".to_string(),
            sender_number: "+15550199".to_string(),
            direction,
            message_timestamp: ts,
            ingestion_timestamp: ts,
        }
    }

    #[test]
    fn empty_partition_yields_empty_facts() {
        let facts = segment(&[]);
        assert_eq!(facts.starter, None);
        assert_eq!(facts.last, None);
        assert_eq!(facts.unique_message_count, 0);
        assert!(facts.response_pairs.is_empty());
    }

    #[test]
    fn counts_directions_and_firsts() {
        let events = vec![
            event(1, "m1", Direction::Incoming, 0),
            event(2, "m2", Direction::Outgoing, 5),
            event(3, "m3", Direction::Incoming, 10),
        ];
        let facts = segment(&events);
        assert_eq!(facts.starter, Some(Direction::Incoming));
        assert_eq!(facts.last, Some(Direction::Incoming));
        assert_eq!(facts.contact_message_count, 2);
        assert_eq!(facts.agent_message_count, 1);
        assert_eq!(facts.first_contact_ts, Some(events[0].message_timestamp));
        assert_eq!(facts.first_agent_ts, Some(events[1].message_timestamp));
    }

    #[test]
    fn response_pairs_are_exactly_in_out_adjacencies() {
        // IN OUT IN IN OUT OUT -> pairs at (0,1) and (3,4); one follow-up.
        let events = vec![
            event(1, "m1", Direction::Incoming, 0),
            event(2, "m2", Direction::Outgoing, 2),
            event(3, "m3", Direction::Incoming, 4),
            event(4, "m4", Direction::Incoming, 6),
            event(5, "m5", Direction::Outgoing, 8),
            event(6, "m6", Direction::Outgoing, 10),
        ];
        let facts = segment(&events);
        assert_eq!(facts.response_pairs.len(), 2);
        assert_eq!(
            facts.response_pairs[0].incoming_ts,
            events[0].message_timestamp
        );
        assert_eq!(
            facts.response_pairs[0].outgoing_ts,
            events[1].message_timestamp
        );
        assert_eq!(
            facts.response_pairs[1].incoming_ts,
            events[3].message_timestamp
        );
        assert_eq!(facts.follow_up_count, 1);

        // Completeness: pair count equals the adjacency count by definition.
        let adjacencies = events
            .windows(2)
            .filter(|w| {
                w[0].direction == Direction::Incoming && w[1].direction == Direction::Outgoing
            })
            .count();
        assert_eq!(facts.response_pairs.len(), adjacencies);
    }

    #[test]
    fn duplicate_message_ids_collapse_in_unique_count() {
        let events = vec![
            event(1, "m1", Direction::Incoming, 0),
            event(2, "m1", Direction::Incoming, 1),
            event(3, "m2", Direction::Outgoing, 2),
        ];
        let facts = segment(&events);
        assert_eq!(facts.unique_message_count, 2);
        assert_eq!(facts.contact_message_count, 2);
    }

    #[test]
    fn chat_order_breaks_timestamp_ties_by_event_id() {
        let mut a = event(10, "m1", Direction::Incoming, 0);
        let b = event(2, "m2", Direction::Outgoing, 0);
        assert_eq!(chat_order(&b, &a), std::cmp::Ordering::Less);
        a.message_timestamp = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        assert_eq!(chat_order(&a, &b), std::cmp::Ordering::Less);
    }

    #[test]
    fn participant_labels() {
        assert_eq!(Direction::Outgoing.participant(), "employee");
        assert_eq!(Direction::Incoming.participant(), "contact");
    }

    #[test]
    fn direction_parse_rejects_unknown() {
        assert_eq!(Direction::parse("INCOMING").unwrap(), Direction::Incoming);
        assert_eq!(Direction::parse("OUTGOING").unwrap(), Direction::Outgoing);
        assert!(Direction::parse("SIDEWAYS").is_err());
    }
}
