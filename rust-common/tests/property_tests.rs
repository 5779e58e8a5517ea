//! Property-based tests for rust-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use proptest::prelude::*;
use rust_common::{HttpConfig, PlatformError, TlsTrust, build_http_client};
use std::path::PathBuf;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_configuration_errors_are_not_retryable(
        msg in "[a-zA-Z0-9 ]{1,50}"
    ) {
        let non_retryable_errors = vec![
            PlatformError::invalid_input(msg.clone()),
            PlatformError::tls(msg.clone()),
            PlatformError::io(
                PathBuf::from(&msg),
                std::io::Error::new(std::io::ErrorKind::NotFound, msg.clone()),
            ),
        ];

        for err in non_retryable_errors {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }

    #[test]
    fn prop_missing_ca_bundle_never_builds(
        name in "[a-z]{4,16}",
    ) {
        let path = PathBuf::from(format!("/nonexistent/{name}/ca.pem"));
        let config = HttpConfig::default().with_tls(TlsTrust::CaBundle(path.clone()));

        match build_http_client(&config) {
            Err(PlatformError::Io { path: reported, .. }) => prop_assert_eq!(reported, path),
            other => prop_assert!(false, "expected Io error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn prop_timeouts_are_optional(
        secs in 1u64..600,
    ) {
        let config = HttpConfig::default();
        prop_assert!(config.timeout.is_none());

        let config = config.with_timeout(Duration::from_secs(secs));
        prop_assert_eq!(config.timeout, Some(Duration::from_secs(secs)));
        prop_assert!(build_http_client(&config).is_ok());
    }
}

#[tokio::test]
async fn test_insecure_client_reaches_plain_http() {
    let client = build_http_client(&HttpConfig::default()).unwrap();
    // Nothing listens on port 9 locally; the request must fail at connect time.
    let err = client
        .get("http://127.0.0.1:9/v1/sys/health")
        .send()
        .await
        .unwrap_err();
    assert!(PlatformError::from(err).is_retryable());
}
