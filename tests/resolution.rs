//! End-to-end tests of the decode → overlay → validate pipeline.

use std::fs;

use auth_config::config::secrets::{secret_paths, secret_value};
use auth_config::config::{load_config, ConfigError};
use auth_config::{resolve, AuthConfig, SecretSource};
use secrecy::ExposeSecret;

mod common;

use common::{at, document, secrets, violations};

#[test]
fn test_empty_document_yields_defaults() {
    let config = resolve(&document(""), &SecretSource::new()).unwrap();

    assert_eq!(
        config.to_redacted_json().unwrap(),
        serde_json::to_value(AuthConfig::default()).unwrap()
    );
    for path in secret_paths(&config) {
        assert_eq!(secret_value(&config, &path), Some(""), "{path} should be empty");
    }
}

#[test]
fn test_secrets_win_over_document() {
    let doc = document(
        r#"
        jwt_secret = "from-document"

        [external.google]
        secret = "from-document"

        [email.smtp]
        pass = "from-document"

        [sms.twilio]
        auth_token = "from-document"
        [sms.twilio_verify]
        auth_token = "from-document"
        [sms.messagebird]
        access_key = "from-document"
        [sms.textlocal]
        api_key = "from-document"
        [sms.vonage]
        api_key = "from-document"
        api_secret = "from-document"

        [hook.send_email]
        secrets = "from-document"
        "#,
    );

    let decoded = auth_config::config::loader::decode_auth(&doc).unwrap();
    let mut overlay = SecretSource::new();
    for path in secret_paths(&decoded) {
        overlay.insert(path.clone(), format!("overlay:{path}"));
    }

    let config = resolve(&doc, &overlay).unwrap();
    for path in secret_paths(&config) {
        let expected = format!("overlay:{path}");
        assert_eq!(secret_value(&config, &path), Some(expected.as_str()));
    }
}

#[test]
fn test_document_secret_kept_without_overlay() {
    let doc = document(
        r#"
        [sms.textlocal]
        api_key = "from-document"
        "#,
    );
    let config = resolve(&doc, &SecretSource::new()).unwrap();
    assert_eq!(config.sms.textlocal.api_key.expose_secret(), "from-document");
}

struct GateCase {
    broken: &'static str,
    fixed: &'static str,
    secrets: &'static [(&'static str, &'static str)],
    missing: &'static str,
}

const GATE_CASES: &[GateCase] = &[
    GateCase {
        broken: "[external.github]\nenabled = true",
        fixed: "[external.github]\nenabled = true\nclient_id = \"gh\"",
        secrets: &[("external.github.secret", "s")],
        missing: "external.github.client_id",
    },
    GateCase {
        broken: "[external.github]\nenabled = true\nclient_id = \"gh\"",
        fixed: "[external.github]\nenabled = true\nclient_id = \"gh\"\nsecret = \"s\"",
        secrets: &[],
        missing: "external.github.secret",
    },
    GateCase {
        broken: "[third_party.firebase]\nenabled = true",
        fixed: "[third_party.firebase]\nenabled = true\nproject_id = \"demo\"",
        secrets: &[],
        missing: "third_party.firebase.project_id",
    },
    GateCase {
        broken: "[third_party.auth0]\nenabled = true",
        fixed: "[third_party.auth0]\nenabled = true\ntenant = \"acme\"",
        secrets: &[],
        missing: "third_party.auth0.tenant",
    },
    GateCase {
        broken: "[third_party.aws_cognito]\nenabled = true\nuser_pool_id = \"pool\"",
        fixed: "[third_party.aws_cognito]\nenabled = true\nuser_pool_id = \"pool\"\nuser_pool_region = \"us-east-1\"",
        secrets: &[],
        missing: "third_party.aws_cognito.user_pool_region",
    },
    GateCase {
        broken: "[sms.twilio_verify]\nenabled = true",
        fixed: "[sms.twilio_verify]\nenabled = true\naccount_sid = \"AC1\"",
        secrets: &[("sms.twilio_verify.auth_token", "t")],
        missing: "sms.twilio_verify.account_sid",
    },
    GateCase {
        broken: "[sms.messagebird]\nenabled = true\noriginator = \"Acme\"",
        fixed: "[sms.messagebird]\nenabled = true\noriginator = \"Acme\"\naccess_key = \"k\"",
        secrets: &[],
        missing: "sms.messagebird.access_key",
    },
    GateCase {
        broken: "[sms.textlocal]\nenabled = true",
        fixed: "[sms.textlocal]\nenabled = true\nsender = \"Acme\"",
        secrets: &[("sms.textlocal.api_key", "k")],
        missing: "sms.textlocal.sender",
    },
    GateCase {
        broken: "[sms.vonage]\nenabled = true\nfrom = \"Acme\"",
        fixed: "[sms.vonage]\nenabled = true\nfrom = \"Acme\"\napi_secret = \"s\"",
        secrets: &[("sms.vonage.api_key", "k")],
        missing: "sms.vonage.api_secret",
    },
    GateCase {
        broken: "[hook.custom_access_token]\nenabled = true",
        fixed: "[hook.custom_access_token]\nenabled = true\nuri = \"pg-functions://postgres/public/hook\"",
        secrets: &[],
        missing: "hook.custom_access_token.uri",
    },
    GateCase {
        broken: "[mfa.phone]\nenroll_enabled = true\ntemplate = \"\"",
        fixed: "[mfa.phone]\nenroll_enabled = true",
        secrets: &[],
        missing: "mfa.phone.template",
    },
];

#[test]
fn test_enable_gates_report_exactly_the_missing_field() {
    for case in GATE_CASES {
        let err = resolve(&document(case.broken), &secrets(case.secrets)).unwrap_err();
        let found = violations(err);
        assert_eq!(found.len(), 1, "{}: {found:?}", case.missing);
        assert_eq!(found[0].path, case.missing);

        let fixed = resolve(&document(case.fixed), &secrets(case.secrets));
        assert!(fixed.is_ok(), "{}: {:?}", case.missing, fixed.err());
    }
}

#[test]
fn test_everything_disabled_never_violates() {
    let doc = document(
        r#"
        site_url = ""

        [external.google]
        enabled = false
        [external.azure]
        enabled = false
        url = "not a url"

        [third_party.firebase]
        enabled = false
        [third_party.auth0]
        enabled = false
        [third_party.aws_cognito]
        enabled = false

        [email]
        enable_confirmations = false
        secure_password_change = false

        [sms.twilio]
        enabled = false
        [sms.twilio_verify]
        enabled = false
        [sms.messagebird]
        enabled = false
        [sms.textlocal]
        enabled = false
        [sms.vonage]
        enabled = false

        [hook.mfa_verification_attempt]
        enabled = false
        [hook.password_verification_attempt]
        enabled = false
        [hook.custom_access_token]
        enabled = false
        [hook.send_sms]
        enabled = false
        [hook.send_email]
        enabled = false
        uri = "ftp://ignored"

        [mfa]
        max_enrolled_factors = 0
        [mfa.totp]
        enroll_enabled = false
        verify_enabled = false
        [mfa.phone]
        enroll_enabled = false
        verify_enabled = false
        otp_length = 0
        template = ""
        [mfa.web_authn]
        enroll_enabled = false
        verify_enabled = false
        "#,
    );

    let config = resolve(&doc, &SecretSource::new()).unwrap();
    assert!(config.enabled_providers().is_empty());
    assert!(config.sms.enabled_vendors().is_empty());
}

#[test]
fn scenario_a_provider_without_client_id() {
    let doc = document(
        r#"
        [external.google]
        enabled = true
        "#,
    );
    let found = violations(resolve(&doc, &SecretSource::new()).unwrap_err());
    assert_eq!(at(&found, "external.google.client_id").len(), 1);
}

#[test]
fn scenario_b_twilio_token_from_overlay() {
    let doc = document(
        r#"
        [sms.twilio]
        enabled = true
        account_sid = "AC123"
        "#,
    );
    let config = resolve(&doc, &secrets(&[("sms.twilio.auth_token", "tw-token")])).unwrap();

    assert!(config.sms.twilio.enabled);
    assert_eq!(config.sms.twilio.account_sid, "AC123");
    assert_eq!(config.sms.twilio.auth_token.expose_secret(), "tw-token");
}

#[test]
fn scenario_c_totp_with_zero_factor_cap() {
    let doc = document(
        r#"
        [mfa]
        max_enrolled_factors = 0
        [mfa.totp]
        enroll_enabled = true
        "#,
    );
    let found = violations(resolve(&doc, &SecretSource::new()).unwrap_err());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, "mfa.max_enrolled_factors");
}

#[test]
fn test_violations_are_collected_across_components() {
    let doc = document(
        r#"
        jwt_expiry = 0
        [external.github]
        enabled = true
        client_id = "gh"
        [sms.vonage]
        enabled = true
        from = "Acme"
        [hook.send_sms]
        enabled = true
        "#,
    );
    let found = violations(resolve(&doc, &SecretSource::new()).unwrap_err());
    let paths: Vec<&str> = found.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "jwt_expiry",
            "external.github.secret",
            "sms.vonage.api_key",
            "sms.vonage.api_secret",
            "hook.send_sms.uri",
        ]
    );
}

#[test]
fn test_decode_errors_are_batched() {
    let doc = document(
        r#"
        enabled = "yes"
        jwt_expiry = -5
        additional_redirect_urls = "https://one.example.com"
        [sessions]
        inactivity_timeout = "a while"
        "#,
    );
    match resolve(&doc, &SecretSource::new()) {
        Err(ConfigError::Decode(errors)) => {
            let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
            assert_eq!(errors.len(), 4, "{paths:?}");
            for expected in ["enabled", "jwt_expiry", "additional_redirect_urls", "sessions.inactivity_timeout"] {
                assert!(paths.contains(&expected), "missing {expected}");
            }
        }
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[test]
fn test_env_secret_source() {
    let doc = document(
        r#"
        [external.github]
        enabled = true
        client_id = "gh"
        [sms.twilio]
        enabled = true
        account_sid = "AC1"
        "#,
    );
    let decoded = auth_config::config::loader::decode_auth(&doc).unwrap();
    let vars = vec![
        ("AUTH_EXTERNAL_GITHUB_SECRET".to_string(), "gh-secret".to_string()),
        ("AUTH_SMS_TWILIO_AUTH_TOKEN".to_string(), "tw-token".to_string()),
        ("AUTH_SITE_URL".to_string(), "https://ignored.example.com".to_string()),
    ];
    let source = SecretSource::from_vars("AUTH", &decoded, vars);

    let config = auth_config::config::overlay_and_validate(decoded, &source).unwrap();
    assert_eq!(config.external["github"].secret.expose_secret(), "gh-secret");
    assert_eq!(config.sms.twilio.auth_token.expose_secret(), "tw-token");
    assert_eq!(config.site_url, "http://127.0.0.1:3000");
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        project_id = "demo"

        [auth]
        site_url = "https://demo.example.com"

        [auth.external.gitlab]
        enabled = true
        client_id = "gl"
        url = "https://gitlab.example.com"
        "#,
    )
    .unwrap();

    let config = load_config(&path, Some("auth"), &secrets(&[("external.gitlab.secret", "gl-secret")])).unwrap();
    assert_eq!(config.site_url, "https://demo.example.com");
    assert_eq!(config.enabled_providers(), vec!["gitlab"]);

    let missing = load_config(&dir.path().join("absent.toml"), None, &SecretSource::new());
    assert!(matches!(missing, Err(ConfigError::Io { .. })));

    let wrong_table = load_config(&path, Some("storage"), &SecretSource::new());
    assert!(matches!(wrong_table, Err(ConfigError::MissingTable(_))));
}

#[test]
fn test_resolved_serialization_never_leaks_secrets() {
    let doc = document(
        r#"
        [email.smtp]
        host = "smtp.example.com"
        "#,
    );
    let config = resolve(
        &doc,
        &secrets(&[("email.smtp.pass", "smtp-password"), ("service_role_key", "service-key")]),
    )
    .unwrap();

    let plain = serde_json::to_string(&*config).unwrap();
    assert!(!plain.contains("smtp-password"));
    assert!(!plain.contains("service-key"));

    let debug = format!("{config:?}");
    assert!(!debug.contains("smtp-password"));

    let full = config.export_with_secrets().unwrap();
    assert_eq!(full["email"]["smtp"]["pass"], "smtp-password");
    assert_eq!(full["service_role_key"], "service-key");
}
