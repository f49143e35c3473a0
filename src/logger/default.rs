//! Built-in backend: formats records itself and writes them to [`Options::out`].

use crate::logger::{merge_fields, Fields, Format, Level, Logger, Options};
use chrono::{DateTime, Local, Offset};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Immutable once built; [`Logger::fields`] returns a new value.
#[derive(Clone, Debug)]
pub struct DefaultLogger {
    opts: Options,
}

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    level: Level,
    #[serde(skip_serializing_if = "str::is_empty")]
    name: &'a str,
    metadata: BTreeMap<&'a str, String>,
    message: String,
}

impl DefaultLogger {
    pub fn new(opts: Options) -> Self {
        DefaultLogger { opts }
    }

    fn render(&self, level: Level, args: fmt::Arguments<'_>, caller: &Location<'_>) -> String {
        let mut metadata: BTreeMap<&str, String> = self
            .opts
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), field_text(v)))
            .collect();
        if level >= Level::Error {
            metadata.insert("file", format!("{}:{}", short_caller_path(caller.file()), caller.line()));
        }
        let record = Record {
            timestamp: format_timestamp(&Local::now()),
            level,
            name: &self.opts.name,
            metadata,
            message: args.to_string(),
        };
        match self.opts.format {
            Format::Text => text_line(&record),
            Format::Json => match serde_json::to_string(&record) {
                Ok(mut line) => {
                    line.push('\n');
                    line
                }
                Err(_) => text_line(&record),
            },
        }
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        DefaultLogger::new(Options::default())
    }
}

impl Logger for DefaultLogger {
    fn name(&self) -> &str {
        "default"
    }

    fn options(&self) -> Options {
        self.opts.clone()
    }

    fn fields(&self, fields: Fields) -> Arc<dyn Logger> {
        let mut opts = self.opts.clone();
        merge_fields(&mut opts.fields, fields);
        Arc::new(DefaultLogger { opts })
    }

    #[track_caller]
    fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.opts.level.enabled(level) {
            return;
        }
        let line = self.render(level, args, Location::caller());
        if let Err(e) = self.opts.out.write_all(line.as_bytes()) {
            eprintln!("log [Logf] write error: {}", e);
        }
    }
}

fn text_line(record: &Record<'_>) -> String {
    let mut line = String::with_capacity(64 + record.message.len());
    if !record.name.is_empty() {
        line.push('[');
        line.push_str(record.name);
        line.push_str("] ");
    }
    line.push_str(&record.timestamp);
    line.push(' ');
    line.push_str(record.level.as_str());
    if !record.metadata.is_empty() {
        line.push(' ');
        let values: Vec<&str> = record.metadata.values().map(String::as_str).collect();
        line.push_str(&values.join(" "));
    }
    line.push(' ');
    line.push_str(&record.message);
    line.push('\n');
    line
}

fn field_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Millisecond precision; `Z` for UTC, `+hhmm` otherwise.
pub fn format_timestamp<Tz: chrono::TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let base = ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
    if ts.offset().fix().local_minus_utc() == 0 {
        format!("{}Z", base)
    } else {
        format!("{}{}", base, ts.format("%z"))
    }
}

/// Keeps the last directory and the file name: `src/runtime/mod.rs` -> `runtime/mod.rs`.
fn short_caller_path(path: &str) -> &str {
    let path_bytes = path.as_bytes();
    let is_sep = |b: &u8| *b == b'/' || *b == b'\\';
    let Some(last) = path_bytes.iter().rposition(is_sep) else {
        return path;
    };
    match path_bytes[..last].iter().rposition(is_sep) {
        Some(prev) => &path[prev + 1..],
        None => path,
    }
}
