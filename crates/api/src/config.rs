//! Process configuration, read from the environment once at startup.
//!
//! Malformed values panic: a misconfigured server should refuse to start
//! rather than run with a silently substituted default.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    /// Fallback language for response messages.
    pub language: String,
    pub tokens: TokenConfig,
}

/// Signing secret and lifetimes for access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_mins: i64,
    pub refresh_ttl_days: i64,
}

impl ServerConfig {
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `APP_LANGUAGE`         | `en`                    |
    ///
    /// Token settings come from [`TokenConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 3000),
            cors_origins: split_origins(&var_or("CORS_ORIGINS", "http://localhost:5173")),
            request_timeout: Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30)),
            language: var_or("APP_LANGUAGE", DEFAULT_LANGUAGE).to_lowercase(),
            tokens: TokenConfig::from_env(),
        }
    }
}

impl TokenConfig {
    /// `JWT_SECRET` is required. `JWT_ACCESS_EXPIRY_MINS` defaults to 15 and
    /// `JWT_REFRESH_EXPIRY_DAYS` to 7.
    pub fn from_env() -> Self {
        let secret = var_or("JWT_SECRET", "");
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");
        Self {
            secret,
            access_ttl_mins: parse_var("JWT_ACCESS_EXPIRY_MINS", 15),
            refresh_ttl_days: parse_var("JWT_REFRESH_EXPIRY_DAYS", 7),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_mins * 60
    }
}

/// Trimmed value of `key`, or `default` when unset or blank.
fn var_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} is invalid ({raw:?}): {e}")),
        Err(_) => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
