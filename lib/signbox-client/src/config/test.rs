use std::time::Duration;

use indoc::indoc;

use super::*;

#[test]
fn test_defaults_when_unset() {
    let config = SignboxConfig::from_yaml(["{}"]).unwrap();

    assert_eq!(config.endpoint, "");
    assert_eq!(config.api_key(), "");
    assert_eq!(config.basic_auth(), None);
    assert_eq!(config.pool.max_connections, 40);
    assert_eq!(config.pool.pending_acquire_timeout, Duration::from_secs(600));
    assert_eq!(config.pool.request_timeout, None);
    assert_eq!(config.unclassified_status, FailureKind::Retryable);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_full_config() {
    let config = SignboxConfig::from_yaml([indoc! {"
        endpoint: https://signbox.example.com/api/sign
        apiKey: secret-key
        username: user
        password: pass
        pool:
          maxConnections: 8
          pendingAcquireTimeout: 30
          requestTimeout: 120
        unclassifiedStatus: PERMANENT
    "}])
    .unwrap();

    assert_eq!(config.endpoint, "https://signbox.example.com/api/sign");
    assert_eq!(config.api_key(), "secret-key");
    assert_eq!(config.basic_auth(), Some(("user", "pass")));
    assert_eq!(
        config.pool,
        PoolConfig {
            max_connections: 8,
            pending_acquire_timeout: Duration::from_secs(30),
            request_timeout: Some(Duration::from_secs(120)),
        }
    );
    assert_eq!(config.unclassified_status, FailureKind::Permanent);
}

#[test]
fn test_later_inputs_override_earlier_ones() {
    let config = SignboxConfig::from_yaml([
        indoc! {"
            endpoint: https://first.example.com
            pool:
              maxConnections: 8
        "},
        indoc! {"
            endpoint: https://second.example.com
        "},
    ])
    .unwrap();

    assert_eq!(config.endpoint, "https://second.example.com");
    assert_eq!(config.pool.max_connections, 8);
    assert_eq!(config.pool.pending_acquire_timeout, Duration::from_secs(600));
}

#[test]
fn test_secrets_are_not_printed() {
    let config = SignboxConfig::from_yaml(["apiKey: very-secret"]).unwrap();

    assert!(!format!("{config:?}").contains("very-secret"));
}

#[test]
fn test_invalid_policy_fails_parsing() {
    let result = SignboxConfig::from_yaml(["unclassifiedStatus: SOMETIMES"]);

    assert!(matches!(
        result,
        Err(ConfigParsingError::GeneralParsingError(_))
    ));
}

#[test]
fn test_unsupported_file_extension() {
    let result = SignboxConfig::from_files(&["config/signbox.toml"]);

    assert!(matches!(
        result,
        Err(ConfigParsingError::GeneralParsingError(_))
    ));
}

#[test]
fn test_validate() {
    let config = SignboxConfig::from_yaml(["endpoint: not a url"]).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigValidationError::InvalidEndpoint(_, _))
    ));

    let config = SignboxConfig::from_yaml(["pool: { maxConnections: 0 }"]).unwrap();
    assert_eq!(
        config.validate(),
        Err(ConfigValidationError::EmptyConnectionPool)
    );
}

#[test]
fn test_basic_auth_with_password_only() {
    let config = SignboxConfig::from_yaml(["password: pass"]).unwrap();

    assert_eq!(config.basic_auth(), Some(("", "pass")));
}
