//! Deterministic upsert plans for the aggregate tables.
//!
//! A plan is a pure value: target table, ordered rows, and a fixed
//! merge-on-key policy (matched rows overwrite the analytics columns and
//! `updated_at`; unmatched rows insert with the planned `created_at`).
//! Re-planning the same inputs yields an identical plan, and executing a
//! plan twice leaves the target rows byte-identical, so retries and
//! out-of-order submission are safe.

use chrono::{DateTime, NaiveDate, Utc};

/// The two aggregate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetTable {
    ConversationSummary,
    DailyPerformanceSummary,
}

impl TargetTable {
    pub fn table_name(self) -> &'static str {
        match self {
            TargetTable::ConversationSummary => "conversation_summary",
            TargetTable::DailyPerformanceSummary => "daily_performance_summary",
        }
    }

    /// Merge keys, in column order.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            TargetTable::ConversationSummary => {
                &["user_id", "org_id", "chat_id", "agent_phone_number"]
            }
            TargetTable::DailyPerformanceSummary => &[
                "activity_date",
                "user_id",
                "org_id",
                "chat_id",
                "agent_phone_number",
            ],
        }
    }

    /// Columns overwritten when the key already exists. `created_at` is
    /// deliberately absent: it survives the first insert.
    pub fn update_columns(self) -> &'static [&'static str] {
        &[
            "conversation_starter",
            "last_message_from",
            "contact_message_count",
            "agent_message_count",
            "unique_message_count",
            "follow_up_count",
            "average_response_time_secs",
            "time_to_first_response_secs",
            "updated_at",
        ]
    }
}

/// The analytics payload shared by both targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryValues {
    pub conversation_starter: Option<&'static str>,
    pub last_message_from: Option<&'static str>,
    pub contact_message_count: i32,
    pub agent_message_count: i32,
    pub unique_message_count: i32,
    pub follow_up_count: i32,
    pub average_response_secs: f64,
    pub first_response_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One planned merge into `conversation_summary`.
#[derive(Debug, Clone, PartialEq)]
pub struct LifetimeRow {
    pub user_id: i64,
    pub org_id: i64,
    pub chat_id: String,
    pub agent_phone_number: String,
    pub values: SummaryValues,
}

/// One planned merge into `daily_performance_summary`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub activity_date: NaiveDate,
    pub user_id: i64,
    pub org_id: i64,
    pub chat_id: String,
    pub agent_phone_number: String,
    pub values: SummaryValues,
}

/// The full set of merges one job run wants applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertPlan {
    pub lifetime: Vec<LifetimeRow>,
    pub daily: Vec<DailyRow>,
}

impl UpsertPlan {
    /// Assemble a plan with a canonical row order, so identical inputs
    /// always produce an identical plan regardless of partition order.
    pub fn new(mut lifetime: Vec<LifetimeRow>, mut daily: Vec<DailyRow>) -> Self {
        lifetime.sort_by(|a, b| {
            (a.user_id, a.org_id, &a.chat_id, &a.agent_phone_number).cmp(&(
                b.user_id,
                b.org_id,
                &b.chat_id,
                &b.agent_phone_number,
            ))
        });
        daily.sort_by(|a, b| {
            (a.activity_date, a.user_id, a.org_id, &a.chat_id, &a.agent_phone_number).cmp(&(
                b.activity_date,
                b.user_id,
                b.org_id,
                &b.chat_id,
                &b.agent_phone_number,
            ))
        });
        Self { lifetime, daily }
    }

    pub fn row_count(&self) -> usize {
        self.lifetime.len() + self.daily.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifetime.is_empty() && self.daily.is_empty()
    }
}

/// Render the merge statement for a target: insert every column, and on a
/// key conflict overwrite only the analytics columns and `updated_at`.
pub fn merge_sql(table: TargetTable) -> String {
    let keys = table.key_columns();
    let updates = table.update_columns();

    let mut columns: Vec<&str> = keys.to_vec();
    // updated_at sits at the end of the column list with created_at before
    // it; update_columns ends with updated_at so strip it here.
    let (analytics, _) = updates.split_at(updates.len() - 1);
    columns.extend_from_slice(analytics);
    columns.push("created_at");
    columns.push("updated_at");

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    let assignments: Vec<String> = updates
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
        table.table_name(),
        columns.join(", "),
        placeholders.join(", "),
        keys.join(", "),
        assignments.join(", "),
    )
}
