//! Logging capability consumed by the runtime and its callers.
//!
//! Backends implement [`Logger`]. [`DefaultLogger`] formats records itself,
//! [`TracingLogger`] forwards them to the `tracing` ecosystem. [`Helper`] adds the
//! level-named convenience methods most call sites use.

pub mod default;
pub mod helper;
pub mod level;
pub mod options;
pub mod tracing_adapter;

pub use default::DefaultLogger;
pub use helper::Helper;
pub use level::{Level, LOG_LEVEL_ENV};
pub use options::{Format, Options, Output, DEFAULT_CALLER_SKIP_COUNT};
pub use tracing_adapter::{init_tracing, TracingLogger};

use crate::error::LoggerError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Structured attributes attached to records. Ordered by key.
pub type Fields = BTreeMap<String, serde_json::Value>;

pub trait Logger: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Effective configuration (threshold, fields, sink, name, caller skip count).
    fn options(&self) -> Options;

    /// New logger carrying `fields` merged over the current ones. `self` is unchanged.
    fn fields(&self, fields: Fields) -> Arc<dyn Logger>;

    /// Emit `args` if `level` passes the threshold. Never fails; write errors go to stderr.
    #[track_caller]
    fn logf(&self, level: Level, args: fmt::Arguments<'_>);

    #[track_caller]
    fn log(&self, level: Level, message: &str) {
        self.logf(level, format_args!("{}", message));
    }

    fn enabled(&self, level: Level) -> bool {
        self.options().level.enabled(level)
    }
}

/// Later keys win.
pub(crate) fn merge_fields(into: &mut Fields, fields: Fields) {
    into.extend(fields);
}

static DEFAULT_LOGGER: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Install the process-wide logger. Only the first call succeeds.
pub fn init_default_logger(logger: Arc<dyn Logger>) -> Result<(), LoggerError> {
    DEFAULT_LOGGER
        .set(logger)
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// Process-wide logger. Built from `ADMIN_LOG_LEVEL` if [`init_default_logger`] was never called.
pub fn default_logger() -> Arc<dyn Logger> {
    DEFAULT_LOGGER
        .get_or_init(|| {
            Arc::new(DefaultLogger::new(
                Options::default().with_level(Level::from_env()),
            ))
        })
        .clone()
}
