//! Secret overlay.
//!
//! # Responsibilities
//! - Hold sensitive values from a trusted source, keyed by dotted path
//! - Overwrite the matching secret fields of a decoded [`AuthConfig`]
//! - Map environment variables onto dotted paths
//!
//! # Design Decisions
//! - Paths are the same dotted keys the config document uses (`sms.twilio.auth_token`)
//! - Overlay always wins over the document
//! - A missing secret is left empty; validation decides whether that matters
//! - Values are never logged, only key names

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::config::schema::{AuthConfig, Hook};

/// Secret paths that do not depend on the shape of the decoded tree.
const FIXED_PATHS: &[&str] = &[
    "jwt_secret",
    "anon_key",
    "service_role_key",
    "email.smtp.pass",
    "sms.twilio.auth_token",
    "sms.twilio_verify.auth_token",
    "sms.messagebird.access_key",
    "sms.textlocal.api_key",
    "sms.vonage.api_key",
    "sms.vonage.api_secret",
];

/// Flat mapping from dotted path to secret value.
#[derive(Default)]
pub struct SecretSource {
    values: BTreeMap<String, SecretString>,
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSource")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one secret.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(path.into(), SecretString::from(value.into()));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a source from the process environment.
    ///
    /// See [`SecretSource::from_vars`].
    pub fn from_env(prefix: &str, config: &AuthConfig) -> Self {
        Self::from_vars(prefix, config, std::env::vars())
    }

    /// Build a source from `NAME=value` pairs.
    ///
    /// Every secret path of `config` is turned into a variable name by
    /// upper-casing it, replacing dots with underscores, and prepending
    /// `PREFIX_`: `sms.twilio.auth_token` is read from
    /// `AUTH_SMS_TWILIO_AUTH_TOKEN`. Deriving names from the schema keeps the
    /// mapping unambiguous even though field names contain underscores.
    ///
    /// Provider names that differ only in case or in `.` versus `_` share a
    /// variable name. The first path in [`secret_paths`] order keeps it and the
    /// collision is logged; the other provider must get its secret some other way.
    pub fn from_vars<I>(prefix: &str, config: &AuthConfig, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_name: BTreeMap<String, String> = BTreeMap::new();
        for path in secret_paths(config) {
            match by_name.entry(env_name(prefix, &path)) {
                Entry::Vacant(slot) => {
                    slot.insert(path);
                }
                Entry::Occupied(taken) => tracing::warn!(
                    variable = %taken.key(),
                    kept = %taken.get(),
                    ignored = %path,
                    "Secret paths share an environment variable"
                ),
            }
        }

        let mut source = Self::new();
        for (name, value) in vars {
            if let Some(path) = by_name.get(&name) {
                source.insert(path.clone(), value);
            }
        }
        source
    }

    /// Overwrite every secret field named by this source.
    ///
    /// Returns the number of fields that were assigned.
    pub fn apply(&self, config: &mut AuthConfig) -> usize {
        let mut applied = 0;
        for (path, value) in &self.values {
            match secret_slot(config, path) {
                Some(slot) => {
                    *slot = SecretString::from(value.expose_secret().to_string());
                    applied += 1;
                }
                None => tracing::debug!(key = %path, "Secret matches no config field"),
            }
        }
        tracing::debug!(applied, total = self.values.len(), "Secret overlay applied");
        applied
    }
}

/// Variable name that carries the secret at `path`.
pub fn env_name(prefix: &str, path: &str) -> String {
    let body = path.replace('.', "_").to_uppercase();
    if prefix.is_empty() {
        body
    } else {
        format!("{}_{}", prefix.to_uppercase(), body)
    }
}

/// Every path the overlay can write for this config, including one per
/// external provider and per hook.
pub fn secret_paths(config: &AuthConfig) -> Vec<String> {
    let mut paths: Vec<String> = FIXED_PATHS.iter().map(|p| p.to_string()).collect();
    paths.extend(
        config
            .external
            .keys()
            .map(|name| format!("external.{name}.secret")),
    );
    paths.extend(Hook::NAMES.iter().map(|name| format!("hook.{name}.secrets")));
    paths
}

/// Split a secret path into its segments.
///
/// Provider and hook names are table keys and may contain dots
/// (`[external."login.gov"]`), so `external.<name>.secret` and
/// `hook.<name>.secrets` take everything between prefix and leaf as the name.
pub fn path_segments(path: &str) -> Vec<&str> {
    for (head, leaf) in [("external", "secret"), ("hook", "secrets")] {
        let name = path
            .strip_prefix(head)
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|rest| rest.strip_suffix(leaf))
            .and_then(|rest| rest.strip_suffix('.'));
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            return vec![head, name, leaf];
        }
    }
    path.split('.').collect()
}

/// Resolve a dotted path to the secret field it addresses.
pub fn secret_slot<'a>(config: &'a mut AuthConfig, path: &str) -> Option<&'a mut SecretString> {
    let segments = path_segments(path);
    match segments.as_slice() {
        ["jwt_secret"] => Some(&mut config.jwt_secret),
        ["anon_key"] => Some(&mut config.anon_key),
        ["service_role_key"] => Some(&mut config.service_role_key),
        ["email", "smtp", "pass"] => Some(&mut config.email.smtp.pass),
        ["sms", "twilio", "auth_token"] => Some(&mut config.sms.twilio.auth_token),
        ["sms", "twilio_verify", "auth_token"] => Some(&mut config.sms.twilio_verify.auth_token),
        ["sms", "messagebird", "access_key"] => Some(&mut config.sms.messagebird.access_key),
        ["sms", "textlocal", "api_key"] => Some(&mut config.sms.textlocal.api_key),
        ["sms", "vonage", "api_key"] => Some(&mut config.sms.vonage.api_key),
        ["sms", "vonage", "api_secret"] => Some(&mut config.sms.vonage.api_secret),
        ["external", name, "secret"] => config.external.get_mut(*name).map(|p| &mut p.secret),
        ["hook", name, "secrets"] => config.hook.get_mut(name).map(|h| &mut h.secrets),
        _ => None,
    }
}

/// Read-only view of the secret at `path`.
pub fn secret_value<'a>(config: &'a AuthConfig, path: &str) -> Option<&'a str> {
    let segments = path_segments(path);
    let secret = match segments.as_slice() {
        ["jwt_secret"] => &config.jwt_secret,
        ["anon_key"] => &config.anon_key,
        ["service_role_key"] => &config.service_role_key,
        ["email", "smtp", "pass"] => &config.email.smtp.pass,
        ["sms", "twilio", "auth_token"] => &config.sms.twilio.auth_token,
        ["sms", "twilio_verify", "auth_token"] => &config.sms.twilio_verify.auth_token,
        ["sms", "messagebird", "access_key"] => &config.sms.messagebird.access_key,
        ["sms", "textlocal", "api_key"] => &config.sms.textlocal.api_key,
        ["sms", "vonage", "api_key"] => &config.sms.vonage.api_key,
        ["sms", "vonage", "api_secret"] => &config.sms.vonage.api_secret,
        ["external", name, "secret"] => &config.external.get(*name)?.secret,
        ["hook", name, "secrets"] => {
            let (_, hook) = config.hook.entries().into_iter().find(|(n, _)| n == name)?;
            &hook.secrets
        }
        _ => return None,
    };
    Some(secret.expose_secret())
}
