//! [`Logger`] backend that forwards records to `tracing`.

use crate::error::LoggerError;
use crate::logger::{merge_fields, Fields, Level, Logger, Options};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Gated by its own threshold first, then by whatever subscriber is installed.
#[derive(Clone, Debug)]
pub struct TracingLogger {
    opts: Options,
}

impl TracingLogger {
    pub fn new(opts: Options) -> Self {
        TracingLogger { opts }
    }

    fn rendered_fields(&self) -> String {
        self.opts
            .fields
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        TracingLogger::new(Options::default())
    }
}

impl Logger for TracingLogger {
    fn name(&self) -> &str {
        "tracing"
    }

    fn options(&self) -> Options {
        self.opts.clone()
    }

    fn fields(&self, fields: Fields) -> Arc<dyn Logger> {
        let mut opts = self.opts.clone();
        merge_fields(&mut opts.fields, fields);
        Arc::new(TracingLogger { opts })
    }

    #[track_caller]
    fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.opts.level.enabled(level) {
            return;
        }
        let caller = Location::caller();
        let name = self.opts.name.as_str();
        let fields = self.rendered_fields();
        match level {
            Level::Trace => tracing::trace!(logger = name, fields = %fields, "{}", args),
            Level::Debug => tracing::debug!(logger = name, fields = %fields, "{}", args),
            Level::Info => tracing::info!(logger = name, fields = %fields, "{}", args),
            Level::Warn => tracing::warn!(logger = name, fields = %fields, "{}", args),
            Level::Error => tracing::error!(
                logger = name,
                fields = %fields,
                file = caller.file(),
                line = caller.line(),
                "{}",
                args
            ),
            Level::Fatal => tracing::error!(
                logger = name,
                fields = %fields,
                file = caller.file(),
                line = caller.line(),
                fatal = true,
                "{}",
                args
            ),
        }
    }
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: Level) -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing().as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
