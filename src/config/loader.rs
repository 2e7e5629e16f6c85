//! Configuration loading from disk.
//!
//! Maps every schema field to its document key. Defaults come from the
//! schema's `Default` impls, so an empty document decodes to exactly
//! `AuthConfig::default()`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::Table;

use crate::config::decode::{DecodeError, Decoder, Section};
use crate::config::resolved::{resolve, ResolvedConfig};
use crate::config::schema::*;
use crate::config::secrets::SecretSource;
use crate::config::validation::Violation;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("table `{0}` not found in config document")]
    MissingTable(String),

    #[error("decode failed: {}", join(.0))]
    Decode(Vec<DecodeError>),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<Violation>),

    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_json::Error),
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay and validate configuration from a TOML file.
///
/// `table` selects a nested table by dotted name (e.g. `"auth"` for a full
/// project file); `None` uses the document root.
pub fn load_config(
    path: &Path,
    table: Option<&str>,
    secrets: &SecretSource,
) -> Result<ResolvedConfig, ConfigError> {
    let document = read_document(path, table)?;
    resolve(&document, secrets)
}

/// Read a TOML file and return the selected table.
pub fn read_document(path: &Path, table: Option<&str>) -> Result<Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Table = toml::from_str(&content)?;
    match table {
        None => Ok(document),
        Some(name) => select_table(document, name),
    }
}

/// Descend into a nested table by dotted name.
pub fn select_table(document: Table, name: &str) -> Result<Table, ConfigError> {
    let mut current = document;
    for segment in name.split('.') {
        current = match current.remove(segment) {
            Some(toml::Value::Table(child)) => child,
            _ => return Err(ConfigError::MissingTable(name.to_string())),
        };
    }
    Ok(current)
}

/// Decode the auth table into an [`AuthConfig`], collecting every mismatch.
pub fn decode_auth(document: &Table) -> Result<AuthConfig, Vec<DecodeError>> {
    let mut d = Decoder::new();
    let root = Section::root(document);
    let config = decode_root(&mut d, &root);
    d.finish(document)?;
    Ok(config)
}

fn decode_root(d: &mut Decoder, s: &Section<'_>) -> AuthConfig {
    let def = AuthConfig::default();

    for key in ["jwt_secret", "anon_key", "service_role_key"] {
        d.refuse(s, key);
    }

    let external = d
        .entries(s, "external")
        .into_iter()
        .map(|(name, section)| (name, decode_provider(d, &section)))
        .collect();

    let hook = d.section(s, "hook");
    let mfa = d.section(s, "mfa");
    let sessions = d.section(s, "sessions");
    let email = d.section(s, "email");
    let sms = d.section(s, "sms");
    let third_party = d.section(s, "third_party");

    AuthConfig {
        enabled: d.bool(s, "enabled", def.enabled),
        site_url: d.string(s, "site_url", &def.site_url),
        additional_redirect_urls: d.string_list(s, "additional_redirect_urls", &def.additional_redirect_urls),
        jwt_expiry: d.uint(s, "jwt_expiry", def.jwt_expiry),
        enable_refresh_token_rotation: d.bool(s, "enable_refresh_token_rotation", def.enable_refresh_token_rotation),
        refresh_token_reuse_interval: d.uint(s, "refresh_token_reuse_interval", def.refresh_token_reuse_interval),
        enable_manual_linking: d.bool(s, "enable_manual_linking", def.enable_manual_linking),
        hook: decode_hook(d, &hook),
        mfa: decode_mfa(d, &mfa),
        sessions: decode_sessions(d, &sessions),
        enable_signup: d.bool(s, "enable_signup", def.enable_signup),
        enable_anonymous_sign_ins: d.bool(s, "enable_anonymous_sign_ins", def.enable_anonymous_sign_ins),
        email: decode_email(d, &email),
        sms: decode_sms(d, &sms),
        external,
        jwt_secret: def.jwt_secret,
        anon_key: def.anon_key,
        service_role_key: def.service_role_key,
        third_party: decode_third_party(d, &third_party),
    }
}

fn decode_provider(d: &mut Decoder, s: &Section<'_>) -> ExternalProvider {
    ExternalProvider {
        enabled: d.bool(s, "enabled", false),
        client_id: d.string(s, "client_id", ""),
        secret: d.secret(s, "secret"),
        url: d.string(s, "url", ""),
        redirect_uri: d.string(s, "redirect_uri", ""),
        skip_nonce_check: d.bool(s, "skip_nonce_check", false),
    }
}

fn decode_third_party(d: &mut Decoder, s: &Section<'_>) -> ThirdParty {
    let firebase = d.section(s, "firebase");
    let auth0 = d.section(s, "auth0");
    let cognito = d.section(s, "aws_cognito");

    ThirdParty {
        firebase: FirebaseConfig {
            enabled: d.bool(&firebase, "enabled", false),
            project_id: d.string(&firebase, "project_id", ""),
        },
        auth0: Auth0Config {
            enabled: d.bool(&auth0, "enabled", false),
            tenant: d.string(&auth0, "tenant", ""),
            tenant_region: d.string(&auth0, "tenant_region", ""),
        },
        aws_cognito: CognitoConfig {
            enabled: d.bool(&cognito, "enabled", false),
            user_pool_id: d.string(&cognito, "user_pool_id", ""),
            user_pool_region: d.string(&cognito, "user_pool_region", ""),
        },
    }
}

fn decode_email(d: &mut Decoder, s: &Section<'_>) -> Email {
    let def = Email::default();

    let template = d
        .entries(s, "template")
        .into_iter()
        .map(|(name, t)| {
            let template = EmailTemplate {
                subject: d.string(&t, "subject", ""),
                content_path: d.string(&t, "content_path", ""),
            };
            (name, template)
        })
        .collect();

    let smtp = d.section(s, "smtp");

    Email {
        enable_signup: d.bool(s, "enable_signup", def.enable_signup),
        double_confirm_changes: d.bool(s, "double_confirm_changes", def.double_confirm_changes),
        enable_confirmations: d.bool(s, "enable_confirmations", def.enable_confirmations),
        secure_password_change: d.bool(s, "secure_password_change", def.secure_password_change),
        template,
        smtp: Smtp {
            host: d.string(&smtp, "host", ""),
            port: d.uint(&smtp, "port", 0u16),
            user: d.string(&smtp, "user", ""),
            pass: d.secret(&smtp, "pass"),
            admin_email: d.string(&smtp, "admin_email", ""),
            sender_name: d.string(&smtp, "sender_name", ""),
        },
        max_frequency: d.duration(s, "max_frequency", def.max_frequency),
        otp_length: d.uint(s, "otp_length", def.otp_length),
        otp_expiry: d.uint(s, "otp_expiry", def.otp_expiry),
    }
}

fn decode_sms(d: &mut Decoder, s: &Section<'_>) -> Sms {
    let def = Sms::default();

    let twilio = d.section(s, "twilio");
    let twilio_verify = d.section(s, "twilio_verify");
    let messagebird = d.section(s, "messagebird");
    let textlocal = d.section(s, "textlocal");
    let vonage = d.section(s, "vonage");

    Sms {
        enable_signup: d.bool(s, "enable_signup", def.enable_signup),
        enable_confirmations: d.bool(s, "enable_confirmations", def.enable_confirmations),
        template: d.string(s, "template", &def.template),
        twilio: decode_twilio(d, &twilio),
        twilio_verify: decode_twilio(d, &twilio_verify),
        messagebird: MessagebirdConfig {
            enabled: d.bool(&messagebird, "enabled", false),
            originator: d.string(&messagebird, "originator", ""),
            access_key: d.secret(&messagebird, "access_key"),
        },
        textlocal: TextlocalConfig {
            enabled: d.bool(&textlocal, "enabled", false),
            sender: d.string(&textlocal, "sender", ""),
            api_key: d.secret(&textlocal, "api_key"),
        },
        vonage: VonageConfig {
            enabled: d.bool(&vonage, "enabled", false),
            from: d.string(&vonage, "from", ""),
            api_key: d.secret(&vonage, "api_key"),
            api_secret: d.secret(&vonage, "api_secret"),
        },
        test_otp: d.string_map(s, "test_otp"),
        max_frequency: d.duration(s, "max_frequency", def.max_frequency),
    }
}

fn decode_twilio(d: &mut Decoder, s: &Section<'_>) -> TwilioConfig {
    TwilioConfig {
        enabled: d.bool(s, "enabled", false),
        account_sid: d.string(s, "account_sid", ""),
        message_service_sid: d.string(s, "message_service_sid", ""),
        auth_token: d.secret(s, "auth_token"),
    }
}

fn decode_hook(d: &mut Decoder, s: &Section<'_>) -> Hook {
    let mut hook = Hook::default();
    for name in Hook::NAMES {
        let entry = d.section(s, name);
        let decoded = HookConfig {
            enabled: d.bool(&entry, "enabled", false),
            uri: d.string(&entry, "uri", ""),
            secrets: d.secret(&entry, "secrets"),
        };
        if let Some(slot) = hook.get_mut(name) {
            *slot = decoded;
        }
    }
    hook
}

fn decode_factor(d: &mut Decoder, s: &Section<'_>) -> FactorType {
    FactorType {
        enroll_enabled: d.bool(s, "enroll_enabled", false),
        verify_enabled: d.bool(s, "verify_enabled", false),
    }
}

fn decode_mfa(d: &mut Decoder, s: &Section<'_>) -> Mfa {
    let def = Mfa::default();
    let totp = d.section(s, "totp");
    let phone = d.section(s, "phone");
    let web_authn = d.section(s, "web_authn");

    Mfa {
        totp: decode_factor(d, &totp),
        // The phone table keeps the shared switches inline next to its own fields.
        phone: PhoneFactorType {
            factor: decode_factor(d, &phone),
            otp_length: d.uint(&phone, "otp_length", def.phone.otp_length),
            template: d.string(&phone, "template", &def.phone.template),
            max_frequency: d.duration(&phone, "max_frequency", def.phone.max_frequency),
        },
        web_authn: decode_factor(d, &web_authn),
        max_enrolled_factors: d.uint(s, "max_enrolled_factors", def.max_enrolled_factors),
    }
}

fn decode_sessions(d: &mut Decoder, s: &Section<'_>) -> Sessions {
    Sessions {
        timebox: d.duration(s, "timebox", std::time::Duration::ZERO),
        inactivity_timeout: d.duration(s, "inactivity_timeout", std::time::Duration::ZERO),
    }
}
