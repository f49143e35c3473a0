pub mod env;
pub mod types;
pub mod validator;

pub use env::{overlay, EnvSource};
pub use types::*;
pub use validator::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level settings document: `{"application": {...}, "logger": {...}}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl Settings {
    /// Read the JSON file at `path` (if any), overlay `env`, then validate.
    pub fn load(path: Option<&Path>, env: &EnvSource) -> Result<Settings, ConfigError> {
        let base = match path {
            Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
            None => serde_json::Value::Object(Default::default()),
        };
        Settings::from_layers(base, env.read()?)
    }

    /// Overlay `env` onto `base`, deserialize and validate.
    pub fn from_layers(mut base: serde_json::Value, env: serde_json::Value) -> Result<Settings, ConfigError> {
        overlay(&mut base, env);
        let settings: Settings = serde_json::from_value(base)?;
        validate_application(&settings.application)?;
        validate_logger(&settings.logger)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn env_overrides_file_values() {
        let base = json!({"application": {"host": "127.0.0.1", "port": 8000, "tenantMode": 1}});
        let env = EnvSource::new().with_stripped_prefix("ADMIN").read_from(vec![
            ("ADMIN_APPLICATION_PORT".to_string(), "9000".to_string()),
            ("ADMIN_APPLICATION_TENANTMODE".to_string(), "2".to_string()),
            ("ADMIN_LOGGER_LEVEL".to_string(), "debug".to_string()),
        ]);
        let settings = Settings::from_layers(base, env).unwrap();
        assert_eq!(settings.application.host, "127.0.0.1");
        assert_eq!(settings.application.port, 9000);
        assert!(settings.application.is_multi_tenant());
        assert_eq!(settings.logger.level, "debug");
    }

    #[test]
    fn env_stdout_key_alongside_file_output_loads() {
        let base = json!({"logger": {"output": "stdout", "level": "info"}});
        let env = EnvSource::new()
            .with_stripped_prefix("ADMIN")
            .read_from(vec![("ADMIN_LOGGER_STDOUT".to_string(), "stderr".to_string())]);
        let settings = Settings::from_layers(base, env).unwrap();
        assert_eq!(settings.logger.output, "stdout");
        assert_eq!(settings.logger.stdout, "stderr");
        assert_eq!(settings.logger.sink(), "stdout");
    }

    #[test]
    fn invalid_layers_fail_validation() {
        let base = json!({"logger": {"level": "chatty"}});
        let err = Settings::from_layers(base, json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLevel(_)));
    }
}
