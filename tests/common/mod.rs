//! Shared fixtures for resolution tests.

use auth_config::config::{ConfigError, Violation};
use auth_config::SecretSource;
use toml::Table;

/// Parse a TOML snippet into a document table.
pub fn document(src: &str) -> Table {
    src.parse().expect("fixture is valid TOML")
}

/// Build a secret source from `(path, value)` pairs.
pub fn secrets(pairs: &[(&str, &str)]) -> SecretSource {
    let mut source = SecretSource::new();
    for (path, value) in pairs {
        source.insert(*path, *value);
    }
    source
}

/// Unwrap a validation failure into its violations.
#[allow(dead_code)]
pub fn violations(err: ConfigError) -> Vec<Violation> {
    match err {
        ConfigError::Validation(violations) => violations,
        other => panic!("expected validation failure, got {other}"),
    }
}

/// Violations whose path is exactly `path`.
#[allow(dead_code)]
pub fn at<'a>(violations: &'a [Violation], path: &str) -> Vec<&'a Violation> {
    violations.iter().filter(|v| v.path == path).collect()
}
