use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub location_ttl_secs: u64,
    pub location_history_cap: usize,
    pub hot_sweep_interval_secs: u64,
    pub max_search_radius_m: f64,
    pub claimable_radius_m: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            location_ttl_secs: parse_or_default("LOCATION_TTL_SECS", 600)?,
            location_history_cap: parse_or_default("LOCATION_HISTORY_CAP", 100)?,
            hot_sweep_interval_secs: parse_or_default("HOT_SWEEP_INTERVAL_SECS", 60)?,
            max_search_radius_m: parse_or_default("MAX_SEARCH_RADIUS_M", 50_000.0)?,
            claimable_radius_m: parse_optional("CLAIMABLE_RADIUS_M")?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
