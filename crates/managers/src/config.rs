//! Process configuration, read from the environment once at startup.

use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

const DEV_TOKEN_SECRET: &str = "dev-long-token-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}': {source}")]
    InvalidNumber {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub service_name: String,
    pub user_port: u16,
    pub long_token_secret: String,
    pub long_token_ttl_days: i64,
    /// Middleware run ahead of every capability's own stack.
    pub pre_stack: Vec<String>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let long_token_secret = match lookup("LONG_TOKEN_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("LONG_TOKEN_SECRET not set; using insecure dev default");
                DEV_TOKEN_SECRET.to_string()
            }
        };

        let pre_stack = match lookup("PRE_STACK") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec!["__device".to_string()],
        };

        let service_name = lookup("SERVICE_NAME").unwrap_or_else(|| "campus".to_string());
        if service_name.trim().is_empty() {
            return Err(ConfigError::Empty("SERVICE_NAME"));
        }

        Ok(Self {
            service_name,
            user_port: number(&lookup, "USER_PORT", 5111)?,
            long_token_secret,
            long_token_ttl_days: number(&lookup, "LONG_TOKEN_TTL_DAYS", 1095)?,
            pre_stack,
            request_timeout: Duration::from_millis(number(&lookup, "REQUEST_TIMEOUT_MS", 30_000)?),
        })
    }

    /// Deterministic values for tests.
    pub fn for_tests() -> Self {
        Self {
            service_name: "campus-test".to_string(),
            user_port: 0,
            long_token_secret: "test-long-token-secret".to_string(),
            long_token_ttl_days: 1,
            pre_stack: vec!["__device".to_string()],
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn long_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.long_token_ttl_days)
    }
}

fn number<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr<Err = ParseIntError>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidNumber { var, value, source }),
    }
}
