//! Error taxonomy for analytics jobs.

use thiserror::Error;

/// A row-level quality problem. Contained to the offending row: the caller
/// logs it and skips the row, it never aborts a job.
#[derive(Debug, Error)]
pub enum DataQualityError {
    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),
    #[error("malformed time '{0}'")]
    MalformedTime(String),
    #[error("unknown message direction '{0}'")]
    UnknownDirection(String),
}

/// A job-fatal failure. Everything here propagates to the orchestrator,
/// which reports the run as failed and leaves the aggregate tables untouched.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store unavailable after {attempts} attempts: {source}")]
    TransientIo {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("upsert rejected by store: {0}")]
    UpsertConflict(#[source] anyhow::Error),
    #[error("job cancelled")]
    Cancelled,
}
