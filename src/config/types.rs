//! Config structs for the server process and its logger, as found in the settings file.

use crate::logger::{DefaultLogger, Format, Level, Logger, Options, Output, TracingLogger};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// File written under [`LoggerConfig::path`] when output is `file`.
pub const LOG_FILE_NAME: &str = "app.log";

/// Serialized as `1` (single tenant) or `2` (multi tenant).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TenantMode {
    #[default]
    Single,
    Multi,
}

impl TryFrom<u8> for TenantMode {
    type Error = ConfigError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(TenantMode::Single),
            2 => Ok(TenantMode::Multi),
            _ => Err(ConfigError::Validation(format!(
                "invalid tenant mode: {} (expected 1 or 2)",
                v
            ))),
        }
    }
}

impl From<TenantMode> for u8 {
    fn from(mode: TenantMode) -> u8 {
        match mode {
            TenantMode::Single => 1,
            TenantMode::Multi => 2,
        }
    }
}

/// HTTP process settings. Lowercase aliases accept keys produced by [`crate::config::EnvSource`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Seconds.
    #[serde(default = "default_timeout", alias = "readtimeout")]
    pub read_timeout: u64,
    /// Seconds.
    #[serde(default = "default_timeout", alias = "writertimeout")]
    pub writer_timeout: u64,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default, alias = "demomsg")]
    pub demo_msg: String,
    /// Data-permission filtering on queries.
    #[serde(default, rename = "enabledp")]
    pub enable_dp: bool,
    #[serde(default, alias = "tenantmode")]
    pub tenant_mode: TenantMode,
}

fn default_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

fn default_mode() -> String {
    "dev".into()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            read_timeout: default_timeout(),
            writer_timeout: default_timeout(),
            host: default_host(),
            port: default_port(),
            name: String::new(),
            mode: default_mode(),
            demo_msg: String::new(),
            enable_dp: false,
            tenant_mode: TenantMode::Single,
        }
    }
}

impl ApplicationConfig {
    pub fn is_multi_tenant(&self) -> bool {
        self.tenant_mode == TenantMode::Multi
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerType {
    #[default]
    Default,
    Tracing,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    #[serde(default, rename = "type")]
    pub type_: LoggerType,
    /// Directory for file output.
    #[serde(default)]
    pub path: String,
    /// Empty means `info`.
    #[serde(default)]
    pub level: String,
    /// `stdout`, `stderr` (default) or `file`. Takes precedence over `stdout`.
    #[serde(default)]
    pub output: String,
    /// Legacy sink key: `default` (stdout) or `file`. Used when `output` is empty.
    #[serde(default)]
    pub stdout: String,
    /// `text` (default) or `json`.
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub name: String,
    /// Consumed by request-log persistence outside this crate.
    #[serde(default, alias = "enableddb")]
    pub enabled_db: bool,
    /// Buffer size for request-log persistence.
    #[serde(default)]
    pub cap: u32,
}

impl LoggerConfig {
    pub fn level(&self) -> Result<Level, ConfigError> {
        if self.level.trim().is_empty() {
            return Ok(Level::Info);
        }
        self.level.parse()
    }

    pub fn format(&self) -> Result<Format, ConfigError> {
        match self.format.trim().to_lowercase().as_str() {
            "" | "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(ConfigError::Validation(format!("invalid log format: {}", other))),
        }
    }

    /// Effective sink name, lowercased.
    pub fn sink(&self) -> String {
        let output = self.output.trim();
        let sink = if output.is_empty() { self.stdout.trim() } else { output };
        sink.to_lowercase()
    }

    fn output(&self) -> Result<Output, ConfigError> {
        match self.sink().as_str() {
            "" | "stderr" => Ok(Output::stderr()),
            "stdout" | "default" => Ok(Output::stdout()),
            "file" => {
                let dir = if self.path.is_empty() { "." } else { self.path.as_str() };
                std::fs::create_dir_all(dir)?;
                Ok(Output::file(Path::new(dir).join(LOG_FILE_NAME))?)
            }
            other => Err(ConfigError::Validation(format!("invalid log output: {}", other))),
        }
    }

    /// Build the configured backend.
    pub fn build(&self) -> Result<Arc<dyn Logger>, ConfigError> {
        let opts = Options::default()
            .with_level(self.level()?)
            .with_format(self.format()?)
            .with_name(self.name.clone())
            .with_output(self.output()?);
        Ok(match self.type_ {
            LoggerType::Default => Arc::new(DefaultLogger::new(opts)),
            LoggerType::Tracing => Arc::new(TracingLogger::new(opts)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_defaults_fill_missing_keys() {
        let cfg: ApplicationConfig = serde_json::from_str(r#"{"name":"admin","tenantMode":2}"#).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert!(cfg.is_multi_tenant());
        assert_eq!(cfg.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn unknown_tenant_mode_is_rejected() {
        let res: Result<ApplicationConfig, _> = serde_json::from_str(r#"{"tenantMode":3}"#);
        assert!(res.is_err());
    }

    #[test]
    fn logger_config_builds_requested_backend() {
        let cfg: LoggerConfig =
            serde_json::from_str(r#"{"type":"tracing","level":"warn","format":"json","output":"stdout"}"#).unwrap();
        let logger = cfg.build().unwrap();
        assert_eq!(logger.name(), "tracing");
        assert_eq!(logger.options().level, Level::Warn);
        assert_eq!(logger.options().format, Format::Json);

        let default = LoggerConfig::default().build().unwrap();
        assert_eq!(default.name(), "default");
        assert_eq!(default.options().level, Level::Info);
    }

    #[test]
    fn stdout_and_output_keys_coexist() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"stdout":"default","output":"stderr"}"#).unwrap();
        assert_eq!(cfg.sink(), "stderr");

        let legacy: LoggerConfig = serde_json::from_str(r#"{"stdout":"default"}"#).unwrap();
        assert_eq!(legacy.sink(), "default");
        assert_eq!(legacy.build().unwrap().options().out.label(), "stdout");
    }

    #[test]
    fn bad_level_or_format_fails_build() {
        let bad_level = LoggerConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(bad_level.build(), Err(ConfigError::InvalidLevel(_))));
        let bad_format = LoggerConfig {
            format: "xml".into(),
            ..Default::default()
        };
        assert!(matches!(bad_format.build(), Err(ConfigError::Validation(_))));
    }
}
