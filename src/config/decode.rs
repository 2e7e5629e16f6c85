//! Typed reads from an untyped TOML tree.
//!
//! # Responsibilities
//! - Coerce leaf values to the declared field type
//! - Fall back to the field default only when a key is absent
//! - Record every coercion failure instead of stopping at the first
//! - Remember which keys were read so leftovers can be reported
//!
//! # Design Decisions
//! - Weak typing for scalars: `"42"` reads as an integer, `true` reads as a string
//! - A malformed value is an error, never a silent default

use std::any::type_name;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use toml::{Table, Value};

use crate::config::duration;

/// A value that could not be coerced to its field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: expected {expected}, found {found}")]
pub struct DecodeError {
    /// Dotted path of the offending key.
    pub path: String,
    /// Declared type of the field.
    pub expected: &'static str,
    /// What the document held instead.
    pub found: String,
}

/// A table within the document, addressed by its dotted path.
///
/// A section whose table is absent behaves as empty, so every field under it
/// takes its default.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    table: Option<&'a Table>,
    path: String,
}

impl<'a> Section<'a> {
    pub fn root(table: &'a Table) -> Self {
        Self {
            table: Some(table),
            path: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dotted path of `key` under this section.
    pub fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.table.and_then(|table| table.get(key))
    }
}

/// Accumulates decode errors and visited keys across one document.
#[derive(Debug, Default)]
pub struct Decoder {
    errors: Vec<DecodeError>,
    seen: HashSet<String>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup<'a>(&mut self, section: &Section<'a>, key: &str) -> Option<(&'a Value, String)> {
        let value = section.get(key)?;
        let path = section.child_path(key);
        self.seen.insert(path.clone());
        Some((value, path))
    }

    fn mismatch(&mut self, path: String, expected: &'static str, value: &Value) {
        self.errors.push(DecodeError {
            path,
            expected,
            found: value.type_str().to_string(),
        });
    }

    /// Descend into a nested table. A non-table value is an error.
    pub fn section<'a>(&mut self, parent: &Section<'a>, key: &str) -> Section<'a> {
        let path = parent.child_path(key);
        let table = match self.lookup(parent, key) {
            None => None,
            Some((Value::Table(table), _)) => Some(table),
            Some((value, path)) => {
                self.mismatch(path, "table", value);
                None
            }
        };
        Section { table, path }
    }

    /// Every named sub-table under `key`, in key order.
    pub fn entries<'a>(&mut self, parent: &Section<'a>, key: &str) -> Vec<(String, Section<'a>)> {
        let map = self.section(parent, key);
        let Some(table) = map.table else {
            return Vec::new();
        };

        let mut entries = Vec::with_capacity(table.len());
        for name in table.keys() {
            let entry = self.section(&map, name);
            if entry.table.is_some() {
                entries.push((name.clone(), entry));
            }
        }
        entries
    }

    pub fn bool(&mut self, section: &Section<'_>, key: &str, default: bool) -> bool {
        match self.lookup(section, key) {
            None => default,
            Some((Value::Boolean(b), _)) => *b,
            Some((Value::String(s), path)) => match s.trim() {
                "true" => true,
                "false" => false,
                _ => {
                    self.errors.push(DecodeError {
                        path,
                        expected: "boolean",
                        found: format!("string {s:?}"),
                    });
                    default
                }
            },
            Some((value, path)) => {
                self.mismatch(path, "boolean", value);
                default
            }
        }
    }

    pub fn string(&mut self, section: &Section<'_>, key: &str, default: &str) -> String {
        match self.lookup(section, key) {
            None => default.to_string(),
            Some((value, path)) => self.coerce_string(value, path).unwrap_or_default(),
        }
    }

    /// Read a sensitive string. Failures never echo the value.
    pub fn secret(&mut self, section: &Section<'_>, key: &str) -> SecretString {
        match self.lookup(section, key) {
            None => SecretString::default(),
            Some((value, path)) => self
                .coerce_string(value, path)
                .map(SecretString::from)
                .unwrap_or_default(),
        }
    }

    fn coerce_string(&mut self, value: &Value, path: String) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Float(f) => Some(f.to_string()),
            other => {
                self.mismatch(path, "string", other);
                None
            }
        }
    }

    /// Read an unsigned integer that must fit `T`.
    pub fn uint<T>(&mut self, section: &Section<'_>, key: &str, default: T) -> T
    where
        T: TryFrom<i64> + Copy,
    {
        let expected = type_name::<T>();
        match self.lookup(section, key) {
            None => default,
            Some((Value::Integer(i), path)) => T::try_from(*i).unwrap_or_else(|_| {
                self.errors.push(DecodeError {
                    path,
                    expected,
                    found: format!("integer {i}"),
                });
                default
            }),
            Some((Value::String(s), path)) => {
                match s.trim().parse::<i64>().ok().and_then(|i| T::try_from(i).ok()) {
                    Some(n) => n,
                    None => {
                        self.errors.push(DecodeError {
                            path,
                            expected,
                            found: format!("string {s:?}"),
                        });
                        default
                    }
                }
            }
            Some((value, path)) => {
                self.mismatch(path, expected, value);
                default
            }
        }
    }

    /// Read a duration string, or a bare integer taken as seconds.
    ///
    /// Go's `time.Duration` would read a bare integer as nanoseconds. Whole
    /// seconds are what config authors mean by `max_frequency = 5`.
    pub fn duration(&mut self, section: &Section<'_>, key: &str, default: Duration) -> Duration {
        match self.lookup(section, key) {
            None => default,
            Some((Value::String(s), path)) => duration::parse(s).unwrap_or_else(|_| {
                self.errors.push(DecodeError {
                    path,
                    expected: "duration",
                    found: format!("string {s:?}"),
                });
                default
            }),
            Some((Value::Integer(i), path)) => match u64::try_from(*i) {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    self.errors.push(DecodeError {
                        path,
                        expected: "duration",
                        found: format!("integer {i}"),
                    });
                    default
                }
            },
            Some((value, path)) => {
                self.mismatch(path, "duration", value);
                default
            }
        }
    }

    /// Read an array of strings, keeping document order.
    pub fn string_list(&mut self, section: &Section<'_>, key: &str, default: &[String]) -> Vec<String> {
        match self.lookup(section, key) {
            None => default.to_vec(),
            Some((Value::Array(items), path)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => self.mismatch(format!("{path}[{i}]"), "string", other),
                    }
                }
                out
            }
            Some((value, path)) => {
                self.mismatch(path, "array of strings", value);
                default.to_vec()
            }
        }
    }

    /// Read a table of plain string values.
    pub fn string_map(&mut self, section: &Section<'_>, key: &str) -> BTreeMap<String, String> {
        let map = self.section(section, key);
        let Some(table) = map.table else {
            return BTreeMap::new();
        };

        let mut out = BTreeMap::new();
        for (name, value) in table {
            let path = map.child_path(name);
            self.seen.insert(path.clone());
            if let Some(s) = self.coerce_string(value, path) {
                out.insert(name.clone(), s);
            }
        }
        out
    }

    /// Mark a key as deliberately unread. Overlay-only fields go through here.
    pub fn refuse(&mut self, section: &Section<'_>, key: &str) {
        if let Some((_, path)) = self.lookup(section, key) {
            tracing::warn!(key = %path, "Ignoring secret in config document; supply it through the secret source");
        }
    }

    /// Log every key of `root` that no field read, then hand back the errors.
    pub fn finish(self, root: &Table) -> Result<(), Vec<DecodeError>> {
        self.report_unknown(&Section::root(root));
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn report_unknown(&self, section: &Section<'_>) {
        let Some(table) = section.table else {
            return;
        };
        for (key, value) in table {
            let path = section.child_path(key);
            if !self.seen.contains(&path) {
                tracing::debug!(key = %path, "Ignoring unknown config key");
                continue;
            }
            if let Value::Table(child) = value {
                self.report_unknown(&Section {
                    table: Some(child),
                    path,
                });
            }
        }
    }
}
