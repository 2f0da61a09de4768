//! Job-run bookkeeping that survives restarts.
//!
//! Run timestamps live in the `app_kv` UNLOGGED table as RFC 3339 strings.
//! Losing them on crash recovery is harmless: the next daily run simply
//! becomes due immediately.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Read the timestamp stored under `key`, or `None` when it is absent or
/// not parseable as RFC 3339.
pub async fn get_timestamp(pool: &PgPool, key: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM app_kv WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.and_then(|v| DateTime::parse_from_rfc3339(&v).ok().map(|dt| dt.to_utc())))
}

/// Store `ts` under `key`, replacing any previous value.
pub async fn set_timestamp(pool: &PgPool, key: &str, ts: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO app_kv (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(ts.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}
