//! Executes upsert plans against the aggregate tables.
//!
//! Each target table is written inside its own transaction so a failed
//! batch never leaves partial rows visible. Every statement is the plan's
//! merge-on-key upsert, so re-executing a plan leaves the rows
//! byte-identical.

use sqlx::PgPool;

use crate::engine::plan::{TargetTable, UpsertPlan, merge_sql};

/// Apply a plan. Returns the number of rows merged.
pub async fn execute_plan(pool: &PgPool, plan: &UpsertPlan) -> Result<u64, sqlx::Error> {
    let mut applied = 0u64;

    if !plan.lifetime.is_empty() {
        let sql = merge_sql(TargetTable::ConversationSummary);
        let mut tx = pool.begin().await?;
        for row in &plan.lifetime {
            sqlx::query(&sql)
                .bind(row.user_id)
                .bind(row.org_id)
                .bind(&row.chat_id)
                .bind(&row.agent_phone_number)
                .bind(row.values.conversation_starter)
                .bind(row.values.last_message_from)
                .bind(row.values.contact_message_count)
                .bind(row.values.agent_message_count)
                .bind(row.values.unique_message_count)
                .bind(row.values.follow_up_count)
                .bind(row.values.average_response_secs)
                .bind(row.values.first_response_secs.map(|s| s as f64))
                .bind(row.values.created_at)
                .bind(row.values.updated_at)
                .execute(&mut *tx)
                .await?;
            applied += 1;
        }
        tx.commit().await?;
    }

    if !plan.daily.is_empty() {
        let sql = merge_sql(TargetTable::DailyPerformanceSummary);
        let mut tx = pool.begin().await?;
        for row in &plan.daily {
            sqlx::query(&sql)
                .bind(row.activity_date)
                .bind(row.user_id)
                .bind(row.org_id)
                .bind(&row.chat_id)
                .bind(&row.agent_phone_number)
                .bind(row.values.conversation_starter)
                .bind(row.values.last_message_from)
                .bind(row.values.contact_message_count)
                .bind(row.values.agent_message_count)
                .bind(row.values.unique_message_count)
                .bind(row.values.follow_up_count)
                .bind(row.values.average_response_secs)
                .bind(row.values.first_response_secs.map(|s| s as f64))
                .bind(row.values.created_at)
                .bind(row.values.updated_at)
                .execute(&mut *tx)
                .await?;
            applied += 1;
        }
        tx.commit().await?;
    }

    Ok(applied)
}
