//! Environment variables as a nested config value.
//!
//! `ADMIN_APPLICATION_PORT=8000` becomes `{"admin": {"application": {"port": 8000}}}`:
//! names are lowercased and split on `_`, values that parse as integers or booleans
//! are typed, everything else stays a string. A prefix given to
//! [`EnvSource::with_prefix`] stays one segment: `GO_ADMIN_CORE_REGISTRY` read with
//! prefix `GO_ADMIN_CORE` becomes `{"go_admin_core": {"registry": "..."}}`.

use crate::error::ConfigError;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default)]
pub struct EnvSource {
    prefixes: Vec<String>,
    stripped_prefixes: Vec<String>,
    dotenv: bool,
}

fn with_underscore(prefix: &str) -> String {
    if prefix.ends_with('_') {
        prefix.to_string()
    } else {
        format!("{}_", prefix)
    }
}

impl EnvSource {
    pub fn new() -> Self {
        EnvSource::default()
    }

    /// Only read variables starting with `prefix`. The prefix stays in the key path.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefixes.push(with_underscore(prefix));
        self
    }

    /// Only read variables starting with `prefix`, and drop it from the key path.
    pub fn with_stripped_prefix(mut self, prefix: &str) -> Self {
        self.stripped_prefixes.push(with_underscore(prefix));
        self
    }

    /// Load `.env` from the working directory before reading. A missing file is not an error.
    pub fn with_dotenv(mut self) -> Self {
        self.dotenv = true;
        self
    }

    pub fn read(&self) -> Result<Value, ConfigError> {
        if self.dotenv {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    return Err(ConfigError::Env(e.to_string()));
                }
            }
        }
        Ok(self.read_from(std::env::vars()))
    }

    /// Build the value from explicit `(name, value)` pairs.
    pub fn read_from<I>(&self, vars: I) -> Value
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: Vec<(String, String)> = vars.into_iter().collect();
        vars.sort();

        let mut root = Map::new();
        for (name, raw) in vars {
            let Some((head, rest)) = self.accept(&name) else {
                continue;
            };
            let mut path: Vec<String> = head.map(str::to_lowercase).into_iter().collect();
            path.extend(
                rest.to_lowercase()
                    .split('_')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
            if path.is_empty() {
                continue;
            }
            let mut value = typed(&raw);
            for segment in path.into_iter().rev() {
                let mut m = Map::new();
                m.insert(segment, value);
                value = Value::Object(m);
            }
            if let Value::Object(m) = value {
                merge_missing(&mut root, m);
            }
        }
        Value::Object(root)
    }

    /// Splits an accepted name into an unsplit leading segment (a kept prefix) and the rest.
    fn accept<'a>(&self, name: &'a str) -> Option<(Option<&'a str>, &'a str)> {
        if self.prefixes.is_empty() && self.stripped_prefixes.is_empty() {
            return Some((None, name));
        }
        if let Some(p) = self.stripped_prefixes.iter().find(|p| name.starts_with(p.as_str())) {
            return Some((None, &name[p.len()..]));
        }
        if let Some(p) = self.prefixes.iter().find(|p| name.starts_with(p.as_str())) {
            let head = &name[..p.len() - 1];
            return Some((Some(head), &name[p.len()..]));
        }
        None
    }
}

fn typed(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw {
        "t" | "T" | "true" | "TRUE" | "True" => Value::Bool(true),
        "f" | "F" | "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Keys already in `into` are kept; nested objects merge recursively.
fn merge_missing(into: &mut Map<String, Value>, from: Map<String, Value>) {
    for (k, v) in from {
        match (into.get_mut(&k), v) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_missing(existing, incoming),
            (Some(_), _) => {}
            (None, v) => {
                into.insert(k, v);
            }
        }
    }
}

/// Overlay `top` onto `base`: scalar leaves of `top` replace, objects merge.
/// Keys match case-insensitively so lowercased env keys land on camelCase file keys.
pub fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(b), Value::Object(t)) => {
            for (k, v) in t {
                let existing = b.keys().find(|bk| bk.eq_ignore_ascii_case(&k)).cloned();
                match existing {
                    Some(key) => {
                        if let Some(slot) = b.get_mut(&key) {
                            overlay(slot, v);
                        }
                    }
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (b, t) => *b = t,
    }
}
