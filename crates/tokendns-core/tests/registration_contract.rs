//! Contract Test: Registration Semantics
//!
//! Constraints verified:
//! - The token set is closed: unknown tokens are rejected by both operations
//! - Secrets are enforced per entry, exactly, and only where configured
//! - Register followed by lookup returns the registered endpoint
//! - Repeating a registration leaves the same state as doing it once
//!
//! If this test fails, the directory state machine is broken.

mod common;

use common::*;
use tokendns_core::{EndpointError, Error, ErrorKind};

#[tokio::test]
async fn unknown_tokens_rejected_by_both_operations() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    for token in ["", "delta", "ALPHA", "alpha ", "*"] {
        assert_eq!(dir.lookup(token).unwrap_err().kind(), ErrorKind::InvalidToken);
        let err = dir
            .register(token, None, Some("10.0.0.1"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken, "token {:?}", token);
    }

    assert_eq!(dir.len(), 3, "register must never create tokens");
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn open_entries_accept_any_secret_argument() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    let secrets = [None, Some(""), Some("Open-Sesame"), Some("whatever")];
    for (i, secret) in secrets.into_iter().enumerate() {
        let ip = format!("10.0.0.{}", i + 1);
        let reg = dir
            .register("alpha", secret, Some(ip.as_str()), None)
            .await
            .unwrap();
        assert_eq!(reg.endpoint.as_str(), ip);
    }
}

#[tokio::test]
async fn secret_entries_require_exact_match() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    for wrong in [None, Some("open-sesame"), Some(" Open-Sesame"), Some("Open-Sesame\n")] {
        let err = dir
            .register("gamma", wrong, Some("10.9.9.9"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden), "secret {:?}", wrong);
    }
    assert_eq!(dir.lookup("gamma").unwrap().as_str(), "127.0.0.1");

    let reg = dir
        .register("gamma", Some("Open-Sesame"), Some("10.9.9.9"), None)
        .await
        .unwrap();
    assert_eq!(reg.token, "gamma");
    assert_eq!(dir.lookup("gamma").unwrap().as_str(), "10.9.9.9");
}

#[tokio::test]
async fn register_then_lookup_roundtrip() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    for ip in ["192.0.2.1", "192.0.2.1:8443", "::1", "[2001:db8::7]:53", "2001:db8::1:8080"] {
        dir.register("beta", None, Some(ip), None).await.unwrap();
        assert_eq!(dir.lookup("beta").unwrap().as_str(), ip);
        assert_eq!(stored_ip(&store.snapshot().await.unwrap(), "beta").as_deref(), Some(ip));
    }
}

#[tokio::test]
async fn origin_hint_used_only_without_explicit_endpoint() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    let reg = dir.register("alpha", None, None, Some("203.0.113.9")).await.unwrap();
    assert_eq!(reg.endpoint.as_str(), "203.0.113.9");

    let err = dir.register("alpha", None, None, None).await.unwrap_err();
    assert!(matches!(err, Error::MissingEndpoint));
    assert_eq!(dir.lookup("alpha").unwrap().as_str(), "203.0.113.9");
}

#[tokio::test]
async fn invalid_endpoints_report_reason_and_write_nothing() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    let cases = [
        ("127.0.0.1:99999", EndpointError::BadPort),
        ("127.0.0.1:abc", EndpointError::BadPort),
        ("not-an-ip", EndpointError::BadAddress),
        ("example.com:80", EndpointError::BadAddress),
    ];
    for (ip, reason) in cases {
        let err = dir.register("alpha", None, Some(ip), None).await.unwrap_err();
        match err {
            Error::InvalidEndpoint(got) => assert_eq!(got, reason, "endpoint {}", ip),
            other => panic!("expected InvalidEndpoint for {}, got {:?}", ip, other),
        }
    }

    assert_eq!(dir.lookup("alpha").unwrap().as_str(), "127.0.0.1");
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn repeated_registration_is_idempotent() {
    let store = MockDirectoryStore::new();
    let dir = directory_with(&store);

    dir.register("alpha", None, Some("198.51.100.4"), None).await.unwrap();
    let once = dir.document();

    dir.register("alpha", None, Some("198.51.100.4"), None).await.unwrap();
    dir.register("alpha", None, Some(" 198.51.100.4 "), None).await.unwrap();

    assert_eq!(dir.document(), once);
    assert_eq!(store.save_count(), 1);
}
