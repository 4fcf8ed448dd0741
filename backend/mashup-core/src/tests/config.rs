use crate::config::{
    DEFAULT_BIND_HOST, DEFAULT_MAX_MESSAGE_SIZE, ENV_CREDS, ENV_PORT, ENV_TLS_SKIP_VALIDATION,
    MashupConfig,
};
use crate::error::ConfigError;
use crate::handshake::CertificateSlot;
use crate::tests::support::self_signed_pem;

use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

fn clear_env() {
    // SAFETY: tests touching the environment are #[serial].
    unsafe {
        std::env::remove_var(ENV_CREDS);
        std::env::remove_var(ENV_PORT);
        std::env::remove_var(ENV_TLS_SKIP_VALIDATION);
    }
}

/// **VALUE**: A missing config file yields defaults.
///
/// **WHY THIS MATTERS**: A mashup launched with only environment variables must start.
#[test]
fn given_missing_file_when_loading_then_returns_defaults() {
    // GIVEN: A path inside an empty temp dir
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("mashup.toml");

    // WHEN: Loading
    let config = MashupConfig::load(&path).expect("Missing file should load defaults");

    // THEN: Defaults
    assert_eq!(config.bind_host, DEFAULT_BIND_HOST);
    assert_eq!(config.port, 0);
    assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    assert!(config.handshake_token.is_empty());
}

/// **VALUE**: TOML values are read, and unspecified fields keep their defaults.
#[test]
fn given_partial_toml_when_loading_then_fields_merge_with_defaults() {
    // GIVEN: A file setting a few fields
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("mashup.toml");
    std::fs::write(
        &path,
        "handshake_token = \"H1\"\nport = 4100\ninsecure_skip_verify = true\n",
    )
    .expect("write");

    // WHEN: Loading
    let config = MashupConfig::load(&path).expect("load");

    // THEN: Given fields set, others default
    assert!(config.handshake_token.matches("H1"));
    assert_eq!(config.port, 4100);
    assert!(config.insecure_skip_verify);
    assert_eq!(config.bind_host, DEFAULT_BIND_HOST);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Malformed TOML is a parse error naming the file.
///
/// **BUG THIS CATCHES**: Would catch a broken file silently falling back to defaults and
/// starting with no credential.
#[test]
fn given_malformed_toml_when_loading_then_parse_error() {
    // GIVEN: A malformed file
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("mashup.toml");
    std::fs::write(&path, "port = \"not a number").expect("write");

    // WHEN: Loading
    let result = MashupConfig::load(&path);

    // THEN: Parse error with the path
    match result {
        Err(ConfigError::Malformed { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected Malformed, got {other:?}"),
    }
}

/// **VALUE**: A config path that exists but cannot be read is reported, not defaulted.
///
/// **BUG THIS CATCHES**: Would catch read failures being treated like a missing file.
#[test]
fn given_directory_as_config_path_when_loading_then_unreadable_error() {
    // GIVEN: A directory where the file should be
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading it as a file
    let result = MashupConfig::load(dir.path());

    // THEN: Unreadable
    match result {
        Err(err @ ConfigError::Unreadable { .. }) => {
            assert!(err.to_string().contains("unreadable"), "{err}");
        }
        other => panic!("Expected Unreadable, got {other:?}"),
    }
}

/// **VALUE**: Environment variables override file values.
///
/// **WHY THIS MATTERS**: The host passes the bootstrap credential to the mashup through
/// the environment when it launches it.
#[test]
#[serial]
fn given_env_vars_when_applying_overrides_then_env_wins() {
    // GIVEN: A config with file values and env vars set
    clear_env();
    let mut config = MashupConfig {
        handshake_token: "from-file".into(),
        port: 4100,
        ..Default::default()
    };
    // SAFETY: #[serial]
    unsafe {
        std::env::set_var(ENV_CREDS, "from-env");
        std::env::set_var(ENV_PORT, "4200");
        std::env::set_var(ENV_TLS_SKIP_VALIDATION, "true");
    }

    // WHEN: Applying overrides
    let result = config.apply_env_overrides();
    clear_env();

    // THEN: Env values win
    result.expect("overrides");
    assert!(config.handshake_token.matches("from-env"));
    assert_eq!(config.port, 4200);
    assert!(config.insecure_skip_verify);
}

/// **VALUE**: An unparseable env value is an error naming the variable.
///
/// **BUG THIS CATCHES**: Would catch a typo in MASHUP_PORT silently binding port 0.
#[test]
#[serial]
fn given_invalid_port_env_when_applying_overrides_then_env_error() {
    // GIVEN: A non-numeric port in the environment
    clear_env();
    // SAFETY: #[serial]
    unsafe {
        std::env::set_var(ENV_PORT, "forty");
    }
    let mut config = MashupConfig::default();

    // WHEN: Applying overrides
    let result = config.apply_env_overrides();
    clear_env();

    // THEN: BadEnv for MASHUP_PORT
    match result {
        Err(ConfigError::BadEnv { variable, .. }) => assert_eq!(variable, ENV_PORT),
        other => panic!("Expected BadEnv, got {other:?}"),
    }
}

/// **VALUE**: Validation rejects unusable combinations.
#[test]
fn given_invalid_values_when_validating_then_validation_error() {
    // GIVEN: Configs with an empty token, zero message size, and a key without a cert
    let empty_token = MashupConfig::default();
    let zero_size = MashupConfig {
        handshake_token: "H1".into(),
        max_message_size: 0,
        ..Default::default()
    };
    let key_only = MashupConfig {
        handshake_token: "H1".into(),
        key_path: Some(PathBuf::from("key.pem")),
        ..Default::default()
    };

    // WHEN/THEN: Each fails validation
    for config in [empty_token, zero_size, key_only] {
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}

/// **VALUE**: The certificate slot reflects what is on disk.
///
/// **WHY THIS MATTERS**: The handshake reports "missing" and "invalid" differently, so
/// loading must keep them apart.
#[test]
fn given_cert_paths_when_building_slot_then_loaded_missing_or_invalid() {
    // GIVEN: A valid cert file, a garbage cert file, and no path
    let dir = TempDir::new().expect("temp dir");
    let (cert_pem, _) = self_signed_pem();
    let good = dir.path().join("good.pem");
    let bad = dir.path().join("bad.pem");
    std::fs::write(&good, cert_pem).expect("write");
    std::fs::write(&bad, "garbage").expect("write");

    let with_path = |path: Option<PathBuf>| MashupConfig {
        cert_path: path,
        ..Default::default()
    };

    // WHEN/THEN: Loaded, Invalid, Missing
    assert!(with_path(Some(good)).certificate_slot().is_loaded());
    assert!(matches!(
        with_path(Some(bad)).certificate_slot(),
        CertificateSlot::Invalid(_)
    ));
    assert!(matches!(
        with_path(None).certificate_slot(),
        CertificateSlot::Missing
    ));
}

/// **VALUE**: IPv6 bind hosts are bracketed.
#[test]
fn given_ipv6_bind_host_when_formatting_bind_address_then_brackets_host() {
    // GIVEN: An IPv6 host
    let config = MashupConfig {
        bind_host: "::1".to_string(),
        port: 4100,
        ..Default::default()
    };

    // WHEN/THEN
    assert_eq!(config.bind_address(), "[::1]:4100");
}
