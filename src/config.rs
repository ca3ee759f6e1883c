//! Runtime configuration from environment variables.
//!
//! | variable               | default                 |
//! |------------------------|-------------------------|
//! | `HOST`                 | `0.0.0.0`               |
//! | `PORT`                 | `8080`                  |
//! | `BACKEND_URL`          | `http://127.0.0.1:8081` |
//! | `REQUEST_TIMEOUT_SECS` | `10`                    |
//! | `CONSOLE_IDLE_HOURS`   | `12`                    |
//! | `SESSION_KEY`          | generated at startup    |

use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("SESSION_KEY must be at least 64 bytes, got {0}")]
    SessionKeyTooShort(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend_url: String,
    pub request_timeout: Duration,
    /// Consoles not touched for this long are dropped.
    pub console_idle_timeout: Duration,
    pub session_key: Option<Vec<u8>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backend_url: "http://127.0.0.1:8081".to_string(),
            request_timeout: Duration::from_secs(10),
            console_idle_timeout: Duration::from_secs(12 * 3600),
            session_key: None,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_number("PORT", port)?;
        }
        if let Some(url) = lookup("BACKEND_URL") {
            config.backend_url = url;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", secs)?);
        }
        if let Some(value) = lookup("CONSOLE_IDLE_HOURS") {
            let hours: u64 = parse_number("CONSOLE_IDLE_HOURS", value.clone())?;
            let secs = hours
                .checked_mul(3600)
                .ok_or(ConfigError::InvalidNumber {
                    key: "CONSOLE_IDLE_HOURS",
                    value,
                })?;
            config.console_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(key) = lookup("SESSION_KEY") {
            if key.len() < 64 {
                return Err(ConfigError::SessionKeyTooShort(key.len()));
            }
            config.session_key = Some(key.into_bytes());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("BACKEND_URL", "https://chess.example"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("CONSOLE_IDLE_HOURS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend_url, "https://chess.example");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.console_idle_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn idle_hours_that_overflow_are_an_error() {
        let huge = u64::MAX.to_string();
        let err = Config::from_lookup(lookup(&[("CONSOLE_IDLE_HOURS", huge.as_str())])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "CONSOLE_IDLE_HOURS",
                value: huge
            }
        );
    }

    #[test]
    fn short_session_key_is_rejected() {
        let err = Config::from_lookup(lookup(&[("SESSION_KEY", "short")])).unwrap_err();
        assert_eq!(err, ConfigError::SessionKeyTooShort(5));
    }
}
