//! Level-named convenience wrapper over any [`Logger`].

use crate::logger::{Fields, Level, Logger};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Helper {
    logger: Arc<dyn Logger>,
}

impl Helper {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Helper { logger }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn with_fields(&self, fields: Fields) -> Helper {
        Helper::new(self.logger.fields(fields))
    }

    pub fn with_error(&self, err: &dyn std::error::Error) -> Helper {
        let mut fields = Fields::new();
        fields.insert("error".into(), serde_json::Value::String(err.to_string()));
        self.with_fields(fields)
    }

    #[track_caller]
    pub fn trace(&self, msg: impl fmt::Display) {
        self.logger.logf(Level::Trace, format_args!("{}", msg));
    }

    #[track_caller]
    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.logger.logf(Level::Trace, args);
    }

    #[track_caller]
    pub fn debug(&self, msg: impl fmt::Display) {
        self.logger.logf(Level::Debug, format_args!("{}", msg));
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logger.logf(Level::Debug, args);
    }

    #[track_caller]
    pub fn info(&self, msg: impl fmt::Display) {
        self.logger.logf(Level::Info, format_args!("{}", msg));
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.logger.logf(Level::Info, args);
    }

    #[track_caller]
    pub fn warn(&self, msg: impl fmt::Display) {
        self.logger.logf(Level::Warn, format_args!("{}", msg));
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.logger.logf(Level::Warn, args);
    }

    #[track_caller]
    pub fn error(&self, msg: impl fmt::Display) {
        self.logger.logf(Level::Error, format_args!("{}", msg));
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logger.logf(Level::Error, args);
    }

    /// Logs at `Fatal`, then exits the process with status 1.
    #[track_caller]
    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.logger.logf(Level::Fatal, format_args!("{}", msg));
        std::process::exit(1)
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.logger.logf(Level::Fatal, args);
        std::process::exit(1)
    }
}

impl From<Arc<dyn Logger>> for Helper {
    fn from(logger: Arc<dyn Logger>) -> Self {
        Helper::new(logger)
    }
}
