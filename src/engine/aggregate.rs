//! Response-time aggregation over segmented conversations.

use chrono_tz::Tz;

use crate::engine::schedule::WeekSchedule;
use crate::engine::segment::ConversationFacts;
use crate::engine::working_time::{ClipMode, working_seconds};

/// Working-hours response metrics for one aggregation key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetrics {
    /// Mean working seconds across the answered pairs, excluding pairs whose
    /// working time is zero; a reply that happened entirely outside working
    /// hours says nothing about responsiveness. Zero when no pair counted.
    pub average_response_secs: f64,
    /// Working seconds between the first customer message and the first
    /// agent message, when the agent message came later.
    pub first_response_secs: Option<i64>,
}

/// Fold a partition's response pairs through the working-interval calculator.
pub fn response_metrics(
    facts: &ConversationFacts,
    week: &WeekSchedule,
    tz: Tz,
    mode: ClipMode,
) -> ResponseMetrics {
    let mut counted = 0u32;
    let mut total = 0i64;
    for pair in &facts.response_pairs {
        let secs = working_seconds(pair.incoming_ts, pair.outgoing_ts, week, tz, mode);
        if secs > 0 {
            counted += 1;
            total += secs;
        }
    }
    let average_response_secs = if counted > 0 {
        total as f64 / f64::from(counted)
    } else {
        0.0
    };

    let first_response_secs = match (facts.first_contact_ts, facts.first_agent_ts) {
        (Some(contact), Some(agent)) if agent > contact => {
            Some(working_seconds(contact, agent, week, tz, mode))
        }
        _ => None,
    };

    ResponseMetrics {
        average_response_secs,
        first_response_secs,
    }
}
