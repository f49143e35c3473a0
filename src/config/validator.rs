//! Config validation run before the runtime is assembled.

use crate::config::{ApplicationConfig, LoggerConfig};
use crate::error::ConfigError;

pub fn validate_application(config: &ApplicationConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation("application host must not be empty".into()));
    }
    if config.port == 0 {
        return Err(ConfigError::Validation("application port must be non-zero".into()));
    }
    if config.read_timeout == 0 || config.writer_timeout == 0 {
        return Err(ConfigError::Validation("application timeouts must be at least one second".into()));
    }
    Ok(())
}

pub fn validate_logger(config: &LoggerConfig) -> Result<(), ConfigError> {
    config.level()?;
    config.format()?;
    match config.sink().as_str() {
        "" | "stderr" | "stdout" | "default" => Ok(()),
        "file" if config.path.trim().is_empty() => Err(ConfigError::Validation(
            "logger path is required for file output".into(),
        )),
        "file" => Ok(()),
        other => Err(ConfigError::Validation(format!("invalid log output: {}", other))),
    }
}
