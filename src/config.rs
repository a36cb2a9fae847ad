use std::env;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AppError;
use crate::models::courier::{CommissionSettings, CommissionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub engine: EngineSettings,
}

/// Business defaults shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub overdue_after: Duration,
    pub default_commission: CommissionSettings,
    pub default_client_flat_fee: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            overdue_after: Duration::hours(60),
            default_commission: CommissionSettings {
                commission_type: CommissionType::Flat,
                commission_value: dec!(10),
            },
            default_client_flat_fee: dec!(15),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = EngineSettings::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            engine: EngineSettings {
                overdue_after: overdue_threshold(parse_or_default("OVERDUE_AFTER_HOURS", 60)?)?,
                default_commission: CommissionSettings {
                    commission_type: parse_or_default(
                        "DEFAULT_COMMISSION_TYPE",
                        defaults.default_commission.commission_type,
                    )?,
                    commission_value: parse_or_default(
                        "DEFAULT_COMMISSION_VALUE",
                        defaults.default_commission.commission_value,
                    )?,
                },
                default_client_flat_fee: parse_or_default(
                    "DEFAULT_CLIENT_FLAT_FEE",
                    defaults.default_client_flat_fee,
                )?,
            },
        })
    }
}

fn overdue_threshold(hours: i64) -> Result<Duration, AppError> {
    Duration::try_hours(hours)
        .filter(|threshold| *threshold >= Duration::zero())
        .ok_or_else(|| AppError::Internal(format!("invalid OVERDUE_AFTER_HOURS: {hours}")))
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
