//! Environment configuration
//!
//! Required: `DATABASE_URL`, `TELEGRAM_BOT_TOKEN`, `CHANNEL_ID`.
//! Everything else has a default. Missing or invalid required values are
//! fatal at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::ingestion::DEFAULT_BACKFILL_LIMIT;
use crate::services::telegram::{TelegramConfig, DEFAULT_API_BASE};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,https://stock.achmad.dev";
const DEFAULT_HEARTBEAT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub telegram: TelegramConfig,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub backfill_limit: usize,
    pub stream_heartbeat: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let database_url = required("DATABASE_URL")?;
        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let channel_id: i64 = parse_var("CHANNEL_ID", &required("CHANNEL_ID")?)?;

        let mut telegram = TelegramConfig::new(bot_token, channel_id);
        telegram.api_base = lookup("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let bind_addr = parse_var(
            "BIND_ADDR",
            &lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backfill_limit = match lookup("BACKFILL_LIMIT") {
            Some(raw) => parse_var("BACKFILL_LIMIT", &raw)?,
            None => DEFAULT_BACKFILL_LIMIT,
        };

        let heartbeat_secs: u64 = match lookup("STREAM_HEARTBEAT_SECS") {
            Some(raw) => parse_var("STREAM_HEARTBEAT_SECS", &raw)?,
            None => DEFAULT_HEARTBEAT_SECS,
        };
        if heartbeat_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "STREAM_HEARTBEAT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url,
            telegram,
            bind_addr,
            cors_origins,
            backfill_limit,
            stream_heartbeat: Duration::from_secs(heartbeat_secs),
        })
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
