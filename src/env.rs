//! Environment variable names used to configure the capture engine.
//!
//! These are helpers for [`EngineConfig::from_env`](crate::init::EngineConfig::from_env);
//! the engine itself never reads the environment.

use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Root level of the engine, e.g. `info` or `trace`. Defaults to `debug`.
pub const LOG_CAPTURE_ROOT_LEVEL_ENV: &str = "LOG_CAPTURE_ROOT_LEVEL";

/// `true`/`false` (or `1`/`0`): whether the console sink is attached to the root.
pub const LOG_CAPTURE_CONSOLE_ENV: &str = "LOG_CAPTURE_CONSOLE";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: `{value}` is not a log level (expected off, error, warn, info, debug or trace)")]
    InvalidLevel { key: &'static str, value: String },
    #[error("{key}: `{value}` is not a boolean")]
    InvalidFlag { key: &'static str, value: String },
}

/// Value of `key`, or `default` when it is unset, blank or not unicode.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

pub(crate) fn parse_level(key: &'static str, value: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(value.trim()).map_err(|_| ConfigError::InvalidLevel {
        key,
        value: value.to_string(),
    })
}

pub(crate) fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
