//! Logger configuration shared by every backend.

use crate::logger::{Fields, Level};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Frames skipped by backends that attribute records by walking the stack.
pub const DEFAULT_CALLER_SKIP_COUNT: usize = 3;

/// Record encoding used by the default backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// `[name] timestamp level metadata message`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Shared output sink. Clones write to the same underlying writer.
#[derive(Clone)]
pub struct Output {
    label: &'static str,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    pub fn stderr() -> Self {
        Self::labeled("stderr", io::stderr())
    }

    pub fn stdout() -> Self {
        Self::labeled("stdout", io::stdout())
    }

    /// Append to `path`, creating it if missing.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::labeled("file", file))
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::labeled("writer", writer)
    }

    fn labeled(label: &'static str, writer: impl Write + Send + 'static) -> Self {
        Output {
            label,
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// `stderr`, `stdout`, `file` or `writer`.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Recovers the sink if an earlier writer panicked while holding it.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        w.write_all(bytes)?;
        w.flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Output").field(&self.label).finish()
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    /// Records below this level are dropped. Default `Info`.
    pub level: Level,
    /// Attached to every record.
    pub fields: Fields,
    /// Default stderr.
    pub out: Output,
    pub caller_skip_count: usize,
    pub name: String,
    pub format: Format,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            level: Level::Info,
            fields: Fields::new(),
            out: Output::stderr(),
            caller_skip_count: DEFAULT_CALLER_SKIP_COUNT,
            name: String::new(),
            format: Format::Text,
        }
    }
}

impl Options {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_output(mut self, out: Output) -> Self {
        self.out = out;
        self
    }

    pub fn with_caller_skip_count(mut self, count: usize) -> Self {
        self.caller_skip_count = count;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}
