//! Environment-variable configuration, extracted through figment.

use chrono_tz::Tz;
use figment::{Figment, providers::Env};
use serde::Deserialize;

use crate::engine::error::JobError;
use crate::engine::working_time::ClipMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string (required).
    pub database_url: String,
    /// Pool size. The jobs service runs statements sequentially, so this
    /// only bounds concurrent API reads.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Reference zone for all weekday and time-of-day computation.
    #[serde(default = "default_timezone")]
    pub schedule_timezone: Tz,
    /// Ingestion lookback of the daily pipeline, in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Reproduce the legacy same-day containment clipping when set.
    #[serde(default)]
    pub strict_same_day_containment: bool,
    /// How often a daily run becomes due, in seconds.
    #[serde(default = "default_daily_interval")]
    pub daily_job_interval_secs: u64,
    /// Graceful shutdown budget, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_db_max_connections() -> u32 {
    8
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timezone() -> Tz {
    chrono_tz::UTC
}
fn default_window_days() -> i64 {
    1
}
fn default_daily_interval() -> u64 {
    3600
}
fn default_shutdown_timeout() -> u64 {
    10
}

impl Config {
    /// Extract configuration from the environment.
    pub fn load() -> Result<Config, JobError> {
        let config: Config = Figment::new()
            .merge(Env::raw())
            .extract()
            .map_err(|e| JobError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), JobError> {
        if self.database_url.is_empty() {
            return Err(JobError::Config("DATABASE_URL must not be empty".into()));
        }
        if self.window_days < 1 {
            return Err(JobError::Config(format!(
                "WINDOW_DAYS must be at least 1, got {}",
                self.window_days
            )));
        }
        if self.daily_job_interval_secs == 0 {
            return Err(JobError::Config(
                "DAILY_JOB_INTERVAL_SECS must be positive".into(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(JobError::Config(
                "DB_MAX_CONNECTIONS must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The partial-day clipping mode this deployment runs with.
    pub fn clip_mode(&self) -> ClipMode {
        if self.strict_same_day_containment {
            ClipMode::Containment
        } else {
            ClipMode::Intersect
        }
    }

    pub fn event_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/chatmetrics".to_string(),
            db_max_connections: default_db_max_connections(),
            port: default_port(),
            log_level: default_log_level(),
            schedule_timezone: default_timezone(),
            window_days: default_window_days(),
            strict_same_day_containment: false,
            daily_job_interval_secs: default_daily_interval(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }

    #[test]
    fn validates_window_days() {
        let mut config = base_config();
        assert!(config.validate().is_ok());
        config.window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_pool() {
        let mut config = base_config();
        config.db_max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn clip_mode_follows_containment_flag() {
        let mut config = base_config();
        assert_eq!(config.clip_mode(), ClipMode::Intersect);
        config.strict_same_day_containment = true;
        assert_eq!(config.clip_mode(), ClipMode::Containment);
    }
}
