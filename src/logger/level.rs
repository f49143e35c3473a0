//! Log levels, totally ordered from `Trace` to `Fatal`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable read by [`Level::from_env`].
pub const LOG_LEVEL_ENV: &str = "ADMIN_LOG_LEVEL";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// True when a record at `level` passes a logger whose threshold is `self`.
    pub fn enabled(self, level: Level) -> bool {
        level >= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Threshold from `ADMIN_LOG_LEVEL`. Unset or malformed values fall back to `Info`.
    pub fn from_env() -> Level {
        Self::from_env_value(std::env::var(LOG_LEVEL_ENV).ok().as_deref())
    }

    pub(crate) fn from_env_value(value: Option<&str>) -> Level {
        value.and_then(|v| v.parse().ok()).unwrap_or(Level::Info)
    }

    pub fn to_tracing(self) -> tracing::Level {
        match self {
            Level::Trace => tracing::Level::TRACE,
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error | Level::Fatal => tracing::Level::ERROR,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}
