//! Configuration schema definitions.
//!
//! This module defines the complete configuration tree of the auth service.
//! Types derive `Serialize` for display; decoding is done by hand in
//! [`loader`](super::loader) so that every malformed field can be reported.
//!
//! Sensitive values are held as [`SecretString`] and marked
//! `skip_serializing`, so the default serialization never contains them.

use std::collections::BTreeMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::duration;

/// Root configuration for the auth service.
#[derive(Debug, Serialize)]
pub struct AuthConfig {
    /// Master switch for the auth service.
    pub enabled: bool,

    /// Base URL used in redirects and email links.
    pub site_url: String,

    /// Extra URLs that redirects are allowed to target, in document order.
    pub additional_redirect_urls: Vec<String>,

    /// Access token lifetime in seconds.
    pub jwt_expiry: u32,

    /// Issue a new refresh token on every use.
    pub enable_refresh_token_rotation: bool,

    /// Seconds a rotated refresh token may still be reused.
    pub refresh_token_reuse_interval: u32,

    /// Allow users to link identities by hand.
    pub enable_manual_linking: bool,

    pub hook: Hook,
    pub mfa: Mfa,
    pub sessions: Sessions,

    /// Allow new users to sign up.
    pub enable_signup: bool,

    /// Allow sessions without an identity.
    pub enable_anonymous_sign_ins: bool,

    pub email: Email,
    pub sms: Sms,

    /// OAuth/OIDC providers keyed by provider name ("google", "github", ...).
    pub external: BTreeMap<String, ExternalProvider>,

    /// Root JWT signing secret. Overlay-only.
    #[serde(skip_serializing)]
    pub jwt_secret: SecretString,

    /// Public API key. Overlay-only.
    #[serde(skip_serializing)]
    pub anon_key: SecretString,

    /// Privileged API key. Overlay-only.
    #[serde(skip_serializing)]
    pub service_role_key: SecretString,

    pub third_party: ThirdParty,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            site_url: "http://127.0.0.1:3000".to_string(),
            additional_redirect_urls: vec!["https://127.0.0.1:3000".to_string()],
            jwt_expiry: 3600,
            enable_refresh_token_rotation: true,
            refresh_token_reuse_interval: 10,
            enable_manual_linking: false,
            hook: Hook::default(),
            mfa: Mfa::default(),
            sessions: Sessions::default(),
            enable_signup: true,
            enable_anonymous_sign_ins: false,
            email: Email::default(),
            sms: Sms::default(),
            external: BTreeMap::new(),
            jwt_secret: SecretString::default(),
            anon_key: SecretString::default(),
            service_role_key: SecretString::default(),
            third_party: ThirdParty::default(),
        }
    }
}

impl AuthConfig {
    /// Names of the external providers that are switched on.
    pub fn enabled_providers(&self) -> Vec<&str> {
        self.external
            .iter()
            .filter(|(_, provider)| provider.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Third-party identity federation.
#[derive(Debug, Default, Serialize)]
pub struct ThirdParty {
    pub firebase: FirebaseConfig,
    pub auth0: Auth0Config,
    pub aws_cognito: CognitoConfig,
}

impl ThirdParty {
    /// Names of the integrations that are switched on.
    pub fn enabled_integrations(&self) -> Vec<&'static str> {
        [
            ("firebase", self.firebase.enabled),
            ("auth0", self.auth0.enabled),
            ("aws_cognito", self.aws_cognito.enabled),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct FirebaseConfig {
    pub enabled: bool,
    pub project_id: String,
}

#[derive(Debug, Default, Serialize)]
pub struct Auth0Config {
    pub enabled: bool,
    pub tenant: String,
    pub tenant_region: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CognitoConfig {
    pub enabled: bool,
    pub user_pool_id: String,
    pub user_pool_region: String,
}

/// Email sign-in and delivery.
#[derive(Debug, Serialize)]
pub struct Email {
    /// Allow sign up with email.
    pub enable_signup: bool,

    /// Require confirmation on both the old and the new address when changing email.
    pub double_confirm_changes: bool,

    /// Require users to confirm their address before signing in.
    pub enable_confirmations: bool,

    /// Require a recent sign in before changing the password.
    pub secure_password_change: bool,

    /// Custom templates keyed by template name ("invite", "recovery", ...).
    pub template: BTreeMap<String, EmailTemplate>,

    pub smtp: Smtp,

    /// Minimum interval between two emails to the same address.
    #[serde(serialize_with = "duration::serialize")]
    pub max_frequency: Duration,

    /// Number of digits in email OTPs.
    pub otp_length: u32,

    /// Seconds an email OTP stays valid.
    pub otp_expiry: u32,
}

impl Default for Email {
    fn default() -> Self {
        Self {
            enable_signup: true,
            double_confirm_changes: true,
            enable_confirmations: false,
            secure_password_change: false,
            template: BTreeMap::new(),
            smtp: Smtp::default(),
            max_frequency: Duration::from_secs(1),
            otp_length: 6,
            otp_expiry: 3600,
        }
    }
}

/// Outgoing mail server.
#[derive(Debug, Default, Serialize)]
pub struct Smtp {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub pass: SecretString,
    /// Sender address.
    pub admin_email: String,
    pub sender_name: String,
}

#[derive(Debug, Default, Serialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub content_path: String,
}

/// Phone sign-in and SMS delivery.
#[derive(Debug, Serialize)]
pub struct Sms {
    pub enable_signup: bool,
    pub enable_confirmations: bool,
    pub template: String,
    pub twilio: TwilioConfig,
    pub twilio_verify: TwilioConfig,
    pub messagebird: MessagebirdConfig,
    pub textlocal: TextlocalConfig,
    pub vonage: VonageConfig,

    /// Fixed codes per phone number. Never use in production.
    pub test_otp: BTreeMap<String, String>,

    #[serde(serialize_with = "duration::serialize")]
    pub max_frequency: Duration,
}

impl Default for Sms {
    fn default() -> Self {
        Self {
            enable_signup: false,
            enable_confirmations: false,
            template: "Your code is {{ .Code }}".to_string(),
            twilio: TwilioConfig::default(),
            twilio_verify: TwilioConfig::default(),
            messagebird: MessagebirdConfig::default(),
            textlocal: TextlocalConfig::default(),
            vonage: VonageConfig::default(),
            test_otp: BTreeMap::new(),
            max_frequency: Duration::from_secs(5),
        }
    }
}

impl Sms {
    /// Names of the SMS vendors that are switched on.
    pub fn enabled_vendors(&self) -> Vec<&'static str> {
        [
            ("twilio", self.twilio.enabled),
            ("twilio_verify", self.twilio_verify.enabled),
            ("messagebird", self.messagebird.enabled),
            ("textlocal", self.textlocal.enabled),
            ("vonage", self.vonage.enabled),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Used for both `twilio` and `twilio_verify`.
#[derive(Debug, Default, Serialize)]
pub struct TwilioConfig {
    pub enabled: bool,
    pub account_sid: String,
    pub message_service_sid: String,
    #[serde(skip_serializing)]
    pub auth_token: SecretString,
}

#[derive(Debug, Default, Serialize)]
pub struct MessagebirdConfig {
    pub enabled: bool,
    pub originator: String,
    #[serde(skip_serializing)]
    pub access_key: SecretString,
}

#[derive(Debug, Default, Serialize)]
pub struct TextlocalConfig {
    pub enabled: bool,
    pub sender: String,
    #[serde(skip_serializing)]
    pub api_key: SecretString,
}

#[derive(Debug, Default, Serialize)]
pub struct VonageConfig {
    pub enabled: bool,
    pub from: String,
    #[serde(skip_serializing)]
    pub api_key: SecretString,
    #[serde(skip_serializing)]
    pub api_secret: SecretString,
}

/// Webhook extension points.
#[derive(Debug, Default, Serialize)]
pub struct Hook {
    pub mfa_verification_attempt: HookConfig,
    pub password_verification_attempt: HookConfig,
    pub custom_access_token: HookConfig,
    pub send_sms: HookConfig,
    pub send_email: HookConfig,
}

impl Hook {
    /// Document key of every hook, in declaration order.
    pub const NAMES: [&'static str; 5] = [
        "mfa_verification_attempt",
        "password_verification_attempt",
        "custom_access_token",
        "send_sms",
        "send_email",
    ];

    /// Every hook paired with its document key.
    pub fn entries(&self) -> [(&'static str, &HookConfig); 5] {
        [
            (Self::NAMES[0], &self.mfa_verification_attempt),
            (Self::NAMES[1], &self.password_verification_attempt),
            (Self::NAMES[2], &self.custom_access_token),
            (Self::NAMES[3], &self.send_sms),
            (Self::NAMES[4], &self.send_email),
        ]
    }

    /// Look up a hook by its document key.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut HookConfig> {
        match name {
            "mfa_verification_attempt" => Some(&mut self.mfa_verification_attempt),
            "password_verification_attempt" => Some(&mut self.password_verification_attempt),
            "custom_access_token" => Some(&mut self.custom_access_token),
            "send_sms" => Some(&mut self.send_sms),
            "send_email" => Some(&mut self.send_email),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct HookConfig {
    pub enabled: bool,
    pub uri: String,
    /// Payload signing secrets, `|`-separated.
    #[serde(skip_serializing)]
    pub secrets: SecretString,
}

/// Enroll/verify switches shared by every factor type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactorType {
    pub enroll_enabled: bool,
    pub verify_enabled: bool,
}

impl FactorType {
    pub fn is_enabled(&self) -> bool {
        self.enroll_enabled || self.verify_enabled
    }
}

/// Phone factor: the common switches plus OTP delivery settings.
#[derive(Debug, Serialize)]
pub struct PhoneFactorType {
    #[serde(flatten)]
    pub factor: FactorType,
    pub otp_length: u32,
    pub template: String,
    #[serde(serialize_with = "duration::serialize")]
    pub max_frequency: Duration,
}

impl Default for PhoneFactorType {
    fn default() -> Self {
        Self {
            factor: FactorType::default(),
            otp_length: 6,
            template: "Your code is {{ .Code }}".to_string(),
            max_frequency: Duration::from_secs(5),
        }
    }
}

/// Multi-factor authentication.
#[derive(Debug, Serialize)]
pub struct Mfa {
    pub totp: FactorType,
    pub phone: PhoneFactorType,
    pub web_authn: FactorType,

    /// Cap on factors enrolled per user.
    pub max_enrolled_factors: u32,
}

impl Default for Mfa {
    fn default() -> Self {
        Self {
            totp: FactorType::default(),
            phone: PhoneFactorType::default(),
            web_authn: FactorType::default(),
            max_enrolled_factors: 10,
        }
    }
}

impl Mfa {
    /// True if any factor type can be enrolled or verified.
    pub fn in_use(&self) -> bool {
        self.totp.is_enabled() || self.phone.factor.is_enabled() || self.web_authn.is_enabled()
    }
}

/// Session lifetime policy. Zero means no limit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sessions {
    /// Absolute session lifetime.
    #[serde(serialize_with = "duration::serialize")]
    pub timebox: Duration,

    /// Sign out after this long without activity.
    #[serde(serialize_with = "duration::serialize")]
    pub inactivity_timeout: Duration,
}

impl Sessions {
    pub fn timebox_limit(&self) -> Option<Duration> {
        (!self.timebox.is_zero()).then_some(self.timebox)
    }

    pub fn inactivity_limit(&self) -> Option<Duration> {
        (!self.inactivity_timeout.is_zero()).then_some(self.inactivity_timeout)
    }
}

/// An OAuth/OIDC identity provider.
#[derive(Debug, Default, Serialize)]
pub struct ExternalProvider {
    pub enabled: bool,
    pub client_id: String,
    /// OAuth client secret.
    #[serde(skip_serializing)]
    pub secret: SecretString,
    /// Base URL for self-hosted providers.
    pub url: String,
    pub redirect_uri: String,
    pub skip_nonce_check: bool,
}

/// True if a secret holds nothing but whitespace.
pub(crate) fn is_blank(secret: &SecretString) -> bool {
    secret.expose_secret().trim().is_empty()
}
