//! Resolution pipeline and its immutable result.

use std::ops::Deref;

use serde::Serialize;
use serde_json::{Map, Value};
use toml::Table;

use crate::config::loader::{decode_auth, ConfigError};
use crate::config::schema::AuthConfig;
use crate::config::secrets::{path_segments, secret_paths, secret_value, SecretSource};
use crate::config::validation::validate_config;

/// A fully decoded, overlaid and validated configuration.
///
/// Read-only: fields are reached through `Deref`, and there is no way to get
/// a mutable reference back.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfig(AuthConfig);

impl Deref for ResolvedConfig {
    type Target = AuthConfig;

    fn deref(&self) -> &AuthConfig {
        &self.0
    }
}

impl ResolvedConfig {
    /// JSON view of the configuration with secret fields omitted.
    pub fn to_redacted_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }

    /// JSON view of the configuration including every secret value.
    ///
    /// Only for trusted sinks; the plain `Serialize` impl never includes secrets.
    pub fn export_with_secrets(&self) -> Result<Value, serde_json::Error> {
        let mut json = self.to_redacted_json()?;
        for path in secret_paths(&self.0) {
            if let Some(value) = secret_value(&self.0, &path) {
                insert_path(&mut json, &path_segments(&path), Value::String(value.to_string()));
            }
        }
        Ok(json)
    }
}

fn insert_path(root: &mut Value, segments: &[&str], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Value::Object(map) = current {
        map.insert(leaf.to_string(), value);
    }
}

/// Run the whole pipeline: decode `document`, overlay `secrets`, validate.
pub fn resolve(document: &Table, secrets: &SecretSource) -> Result<ResolvedConfig, ConfigError> {
    let config = decode_auth(document).map_err(ConfigError::Decode)?;
    overlay_and_validate(config, secrets)
}

/// Finish the pipeline for an already decoded tree.
///
/// Used when the secret source itself depends on the decoded tree, as with
/// [`SecretSource::from_env`].
pub fn overlay_and_validate(
    mut config: AuthConfig,
    secrets: &SecretSource,
) -> Result<ResolvedConfig, ConfigError> {
    secrets.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    let vendors = config.sms.enabled_vendors();
    tracing::info!(
        enabled = config.enabled,
        providers = ?config.enabled_providers(),
        sms_vendor = vendors.first().copied().unwrap_or("none"),
        "Auth configuration resolved"
    );

    Ok(ResolvedConfig(config))
}
