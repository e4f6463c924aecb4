use std::time::Duration;

use broker::BrokerConfig;
use thiserror::Error;

use crate::services::Component;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, shared by the worker and the scheduler
#[derive(Debug, Clone)]
pub struct Config {
    pub component: Component,
    pub broker: BrokerConfig,
    pub database_url: String,
    pub max_connections: u32,
    pub health_port: u16,
    /// Scheduler tick interval
    pub poll_interval: Duration,
    /// Age of `last_fetched_at` after which a source is due for refresh
    pub staleness_threshold: chrono::Duration,
    /// Upper bound for one feed HTTP request
    pub request_timeout: Duration,
    /// Fixed backoff between broker/database reconnection attempts
    pub reconnect_delay: Duration,
    /// Upper bound for one scheduler publish
    pub publish_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env(component: Component) -> Result<Self, ConfigError> {
        Self::from_lookup(component, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(component: Component, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let broker = BrokerConfig {
            user: required("RABBITMQ_USER")?,
            password: required("RABBITMQ_PASSWORD")?,
            host: required("RABBITMQ_HOST")?,
            port: parse_or(&lookup, "RABBITMQ_PORT", BrokerConfig::DEFAULT_PORT)?,
        };

        let default_health_port = match component {
            Component::Worker => 8090,
            Component::Scheduler => 8080,
        };

        let threshold_minutes: i64 = parse_or(&lookup, "STALENESS_THRESHOLD_MINUTES", 60)?;
        let staleness_threshold = Some(threshold_minutes)
            .filter(|minutes| *minutes >= 0)
            .and_then(chrono::Duration::try_minutes)
            .ok_or_else(|| ConfigError::Invalid {
                name: "STALENESS_THRESHOLD_MINUTES",
                value: threshold_minutes.to_string(),
            })?;

        Ok(Self {
            component,
            broker,
            database_url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            health_port: parse_or(&lookup, "HEALTH_PORT", default_health_port)?,
            poll_interval: positive_secs(&lookup, "POLL_INTERVAL_SECS", 300)?,
            staleness_threshold,
            request_timeout: positive_secs(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            reconnect_delay: Duration::from_secs(parse_or(&lookup, "RECONNECT_DELAY_SECS", 5)?),
            publish_timeout: positive_secs(&lookup, "PUBLISH_TIMEOUT_SECS", 5)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        }
        _ => Ok(default),
    }
}

/// Whole seconds that must be greater than zero
fn positive_secs<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, name, default)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
