//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles types)
//! - Enforce "enabled implies required fields" for every gated component
//! - Validate value ranges (token lifetimes, OTP lengths, factor caps)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AuthConfig → Result<(), Vec<Violation>>
//! - Rules are independent; one provider's state never affects another's checks

use std::ops::RangeInclusive;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::config::schema::{is_blank, AuthConfig, HookConfig};

const JWT_EXPIRY_RANGE: RangeInclusive<u32> = 1..=604_800;
const OTP_LENGTH_RANGE: RangeInclusive<u32> = 6..=10;
const MAX_EMAIL_OTP_EXPIRY: u32 = 86_400;
const HOOK_SCHEMES: &[&str] = &["http", "https", "pg-functions"];
const HOOK_SECRET_PREFIX: &str = "v1,whsec_";

/// A rule the configuration breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {rule}")]
pub struct Violation {
    /// Dotted path of the offending field.
    pub path: String,
    /// Human-readable description of the rule.
    pub rule: String,
}

/// Collects violations while walking the tree.
#[derive(Default)]
struct Report {
    violations: Vec<Violation>,
}

impl Report {
    fn push(&mut self, path: impl Into<String>, rule: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            rule: rule.into(),
        });
    }

    fn require(&mut self, path: impl Into<String>, value: &str, reason: &str) {
        if value.trim().is_empty() {
            self.push(path, format!("required when {reason}"));
        }
    }

    fn require_secret(&mut self, path: impl Into<String>, value: &SecretString, reason: &str) {
        if is_blank(value) {
            self.push(path, format!("required when {reason}"));
        }
    }

    fn within(&mut self, path: impl Into<String>, value: u32, range: RangeInclusive<u32>) {
        if !range.contains(&value) {
            self.push(
                path,
                format!("must be between {} and {}, got {value}", range.start(), range.end()),
            );
        }
    }

    fn absolute_url(&mut self, path: impl Into<String>, value: &str) {
        if !value.is_empty() && Url::parse(value).is_err() {
            self.push(path, format!("invalid URL {value:?}"));
        }
    }
}

/// Validate a merged configuration.
///
/// Returns every violation found, in a stable order.
pub fn validate_config(config: &AuthConfig) -> Result<(), Vec<Violation>> {
    let mut report = Report::default();

    check_root(config, &mut report);
    check_external(config, &mut report);
    check_third_party(config, &mut report);
    check_email(config, &mut report);
    check_sms(config, &mut report);
    check_hooks(config, &mut report);
    check_mfa(config, &mut report);

    tracing::debug!(violations = report.violations.len(), "Config validated");

    if report.violations.is_empty() {
        Ok(())
    } else {
        Err(report.violations)
    }
}

fn check_root(config: &AuthConfig, report: &mut Report) {
    report.within("jwt_expiry", config.jwt_expiry, JWT_EXPIRY_RANGE);
    report.absolute_url("site_url", &config.site_url);
}

fn check_external(config: &AuthConfig, report: &mut Report) {
    for (name, provider) in &config.external {
        if !provider.enabled {
            continue;
        }
        let reason = format!("external.{name} is enabled");
        report.require(format!("external.{name}.client_id"), &provider.client_id, &reason);
        report.require_secret(format!("external.{name}.secret"), &provider.secret, &reason);
        report.absolute_url(format!("external.{name}.url"), &provider.url);
        report.absolute_url(format!("external.{name}.redirect_uri"), &provider.redirect_uri);
    }
}

fn check_third_party(config: &AuthConfig, report: &mut Report) {
    let tpa = &config.third_party;

    if tpa.firebase.enabled {
        report.require(
            "third_party.firebase.project_id",
            &tpa.firebase.project_id,
            "third_party.firebase is enabled",
        );
    }
    if tpa.auth0.enabled {
        report.require("third_party.auth0.tenant", &tpa.auth0.tenant, "third_party.auth0 is enabled");
    }
    if tpa.aws_cognito.enabled {
        let reason = "third_party.aws_cognito is enabled";
        report.require("third_party.aws_cognito.user_pool_id", &tpa.aws_cognito.user_pool_id, reason);
        report.require(
            "third_party.aws_cognito.user_pool_region",
            &tpa.aws_cognito.user_pool_region,
            reason,
        );
    }

    let enabled = tpa.enabled_integrations();
    if enabled.len() > 1 {
        report.push(
            "third_party",
            format!("at most one integration may be enabled, found {}", enabled.join(", ")),
        );
    }
}

fn check_email(config: &AuthConfig, report: &mut Report) {
    let email = &config.email;

    if email.enable_confirmations || email.secure_password_change {
        let reason = "email confirmations or secure password change are enabled";
        report.require("email.smtp.host", &email.smtp.host, reason);
        if email.smtp.port == 0 {
            report.push("email.smtp.port", format!("required when {reason}"));
        }
        report.require("email.smtp.admin_email", &email.smtp.admin_email, reason);
    }

    report.within("email.otp_length", email.otp_length, OTP_LENGTH_RANGE);
    if email.otp_expiry > MAX_EMAIL_OTP_EXPIRY {
        report.push(
            "email.otp_expiry",
            format!("must be at most {MAX_EMAIL_OTP_EXPIRY}, got {}", email.otp_expiry),
        );
    }
}

fn check_sms(config: &AuthConfig, report: &mut Report) {
    let sms = &config.sms;

    for (prefix, twilio) in [("sms.twilio", &sms.twilio), ("sms.twilio_verify", &sms.twilio_verify)] {
        if twilio.enabled {
            let reason = format!("{prefix} is enabled");
            report.require(format!("{prefix}.account_sid"), &twilio.account_sid, &reason);
            report.require_secret(format!("{prefix}.auth_token"), &twilio.auth_token, &reason);
        }
    }
    if sms.messagebird.enabled {
        let reason = "sms.messagebird is enabled";
        report.require("sms.messagebird.originator", &sms.messagebird.originator, reason);
        report.require_secret("sms.messagebird.access_key", &sms.messagebird.access_key, reason);
    }
    if sms.textlocal.enabled {
        let reason = "sms.textlocal is enabled";
        report.require("sms.textlocal.sender", &sms.textlocal.sender, reason);
        report.require_secret("sms.textlocal.api_key", &sms.textlocal.api_key, reason);
    }
    if sms.vonage.enabled {
        let reason = "sms.vonage is enabled";
        report.require("sms.vonage.from", &sms.vonage.from, reason);
        report.require_secret("sms.vonage.api_key", &sms.vonage.api_key, reason);
        report.require_secret("sms.vonage.api_secret", &sms.vonage.api_secret, reason);
    }

    let enabled = sms.enabled_vendors();
    if enabled.len() > 1 {
        report.push(
            "sms",
            format!("at most one provider may be enabled, found {}", enabled.join(", ")),
        );
    }

    for (phone, code) in &sms.test_otp {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            report.push(format!("sms.test_otp.{phone}"), "code must be a string of digits");
        }
    }
}

fn check_hooks(config: &AuthConfig, report: &mut Report) {
    for (name, hook) in config.hook.entries() {
        if hook.enabled {
            check_hook(name, hook, report);
        }
    }
}

fn check_hook(name: &str, hook: &HookConfig, report: &mut Report) {
    let path = format!("hook.{name}");
    if hook.uri.trim().is_empty() {
        report.push(format!("{path}.uri"), format!("required when {path} is enabled"));
        return;
    }

    let scheme = match Url::parse(&hook.uri) {
        Ok(uri) => uri.scheme().to_string(),
        Err(_) => {
            report.push(format!("{path}.uri"), format!("invalid URL {:?}", hook.uri));
            return;
        }
    };
    if !HOOK_SCHEMES.contains(&scheme.as_str()) {
        report.push(
            format!("{path}.uri"),
            format!("scheme must be one of {}, got {scheme}", HOOK_SCHEMES.join(", ")),
        );
        return;
    }

    if scheme == "http" || scheme == "https" {
        let secrets = hook.secrets.expose_secret();
        if secrets.is_empty() {
            report.push(format!("{path}.secrets"), "required for HTTP hooks");
        } else if !secrets.split('|').all(|s| s.starts_with(HOOK_SECRET_PREFIX)) {
            report.push(
                format!("{path}.secrets"),
                format!("every secret must start with {HOOK_SECRET_PREFIX:?}"),
            );
        }
    }
}

fn check_mfa(config: &AuthConfig, report: &mut Report) {
    let mfa = &config.mfa;

    if mfa.in_use() && mfa.max_enrolled_factors < 1 {
        report.push(
            "mfa.max_enrolled_factors",
            "must be at least 1 when any factor type is enabled",
        );
    }

    if mfa.phone.factor.is_enabled() {
        report.within("mfa.phone.otp_length", mfa.phone.otp_length, OTP_LENGTH_RANGE);
        report.require("mfa.phone.template", &mfa.phone.template, "mfa.phone is enabled");
    }
}
