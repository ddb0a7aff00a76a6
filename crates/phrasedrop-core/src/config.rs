//! Phrasedrop configuration (TOML).
//!
//! Everything is validated at load time; the delivery core only ever sees
//! typed values. A bad anchor or period is fatal here, not at the first tick.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PhrasedropError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhrasedropConfig {
    /// Telegram bot token used for both delivery and operator escalation.
    pub bot_token: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub error_mail: Option<ErrorMailConfig>,
}

fn default_working_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".phrasedrop")
}

/// When delivery cycles fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Anchor instant, RFC 3339 with an explicit UTC offset. Naive
    /// timestamps are rejected.
    pub start_time: String,
    /// Period between cycles as "HH:MM:SS", strictly positive.
    pub period: String,
}

impl ScheduleConfig {
    pub fn anchor(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.start_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                PhrasedropError::Config(format!(
                    "bad schedule.start_time '{}': {e} (an explicit UTC offset is required)",
                    self.start_time
                ))
            })
    }

    pub fn period(&self) -> Result<Duration> {
        let parts: Vec<&str> = self.period.split(':').collect();
        let [hours, minutes, seconds] = parts.as_slice() else {
            return Err(PhrasedropError::Config(format!(
                "bad schedule.period '{}': expected HH:MM:SS",
                self.period
            )));
        };
        let parse = |field: &str| {
            field.parse::<u32>().map_err(|e| {
                PhrasedropError::Config(format!("bad schedule.period '{}': {e}", self.period))
            })
        };
        let period = Duration::hours(i64::from(parse(hours)?))
            + Duration::minutes(i64::from(parse(minutes)?))
            + Duration::seconds(i64::from(parse(seconds)?));
        if period <= Duration::zero() {
            return Err(PhrasedropError::Config(format!(
                "schedule.period '{}' must be strictly positive",
                self.period
            )));
        }
        Ok(period)
    }
}

/// SMTP escalation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from_addr: String,
    pub password: String,
    pub to_addr: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl PhrasedropConfig {
    /// Load and validate config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PhrasedropError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PhrasedropError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config path (~/.phrasedrop/config.toml).
    pub fn default_path() -> PathBuf {
        default_working_dir().join("config.toml")
    }

    pub fn db_path(&self) -> PathBuf {
        self.working_dir.join("phrasedrop.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.working_dir.join("logs")
    }

    fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            return Err(PhrasedropError::Config("bot_token must not be empty".into()));
        }
        self.schedule.anchor()?;
        self.schedule.period()?;
        Ok(())
    }
}
