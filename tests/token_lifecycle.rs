//! Token lifecycle tests
//!
//! Drives login, reuse, expiry and refresh through EwhsClient with a
//! controllable clock, verifying the exact number of exchanges with
//! wiremock expectations.

use ewhs_sdk::{Clock, ClientConfig, EwhsClient, EwhsError, TokenState};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Clock whose time only moves when a test says so
#[derive(Debug, Default)]
struct ManualClock(AtomicI64);

impl ManualClock {
    fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn client_with_clock(mock_server: &MockServer, clock: Arc<ManualClock>) -> EwhsClient {
    EwhsClient::with_clock(
        ClientConfig::new("api-user", "secret").with_api_url(mock_server.uri()),
        clock,
    )
    .unwrap()
}

async fn mount_orders_for(mock_server: &MockServer, token: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(times)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_login_once_and_reuse_token_until_expiry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .and(body_json(json!({"username": "api-user", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-1",
            "token": "access-1",
            "expires_at": 1_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_orders_for(&mock_server, "access-1", 3).await;

    let clock = ManualClock::at(500);
    let client = client_with_clock(&mock_server, clock.clone());

    client.orders().list(&[]).await.unwrap();
    client.orders().list(&[]).await.unwrap();

    // Still valid at exactly expires_at
    clock.set(1_000);
    client.orders().list(&[]).await.unwrap();

    let state = client.token_manager().state().await;
    assert_eq!(state.access_token.as_deref(), Some("access-1"));
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(state.expires_at, 1_000);
}

#[tokio::test]
async fn test_expired_token_triggers_single_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-1",
            "token": "access-1",
            "expires_at": 1_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/refresh"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-2",
            "token": "access-2",
            "expires_at": 2_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_orders_for(&mock_server, "access-1", 1).await;
    mount_orders_for(&mock_server, "access-2", 2).await;

    let clock = ManualClock::at(500);
    let client = client_with_clock(&mock_server, clock.clone());

    client.orders().list(&[]).await.unwrap();

    clock.set(1_001);
    client.orders().list(&[]).await.unwrap();
    client.orders().list(&[]).await.unwrap();

    let state = client.token_manager().state().await;
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(state.expires_at, 2_000);
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_logs_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-9",
            "token": "access-9",
            "expires_at": 9_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_orders_for(&mock_server, "access-9", 1).await;

    let clock = ManualClock::at(5_000);
    let client = client_with_clock(&mock_server, clock);
    client
        .token_manager()
        .restore(TokenState {
            access_token: Some("stale".to_string()),
            refresh_token: None,
            expires_at: 4_000,
        })
        .await;

    client.orders().list(&[]).await.unwrap();
}

#[tokio::test]
async fn test_restored_valid_token_skips_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_orders_for(&mock_server, "saved-access", 1).await;

    let client = client_with_clock(&mock_server, ManualClock::at(100));
    client
        .token_manager()
        .restore(TokenState {
            access_token: Some("saved-access".to_string()),
            refresh_token: Some("saved-refresh".to_string()),
            expires_at: 200,
        })
        .await;

    client.orders().list(&[]).await.unwrap();
}

#[tokio::test]
async fn test_login_failure_uses_server_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials."})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_clock(&mock_server, ManualClock::at(0));
    let error = client.orders().list(&[]).await.unwrap_err();

    match error {
        EwhsError::Authentication { message, body } => {
            assert_eq!(message, "Invalid credentials.");
            assert_eq!(body, Some(json!({"message": "Invalid credentials."})));
        }
        other => panic!("expected Authentication, got {:?}", other),
    }

    assert_eq!(client.token_manager().state().await, TokenState::default());
}

#[tokio::test]
async fn test_login_failure_without_message_uses_raw_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_clock(&mock_server, ManualClock::at(0));
    let error = client.orders().list(&[]).await.unwrap_err();

    match error {
        EwhsError::Authentication { message, body } => {
            assert_eq!(message, "Service Unavailable");
            assert_eq!(body, None);
        }
        other => panic!("expected Authentication, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_token_response_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "only"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_clock(&mock_server, ManualClock::at(0));
    let result = client.orders().list(&[]).await;

    assert!(matches!(result, Err(EwhsError::Protocol(_))));
    assert_eq!(client.token_manager().state().await, TokenState::default());
}

#[tokio::test]
async fn test_failed_refresh_does_not_fall_back_to_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid refresh token"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-new",
            "token": "access-new",
            "expires_at": 10_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_orders_for(&mock_server, "access-new", 1).await;

    let client = client_with_clock(&mock_server, ManualClock::at(5_000));
    let revoked = TokenState {
        access_token: Some("access-old".to_string()),
        refresh_token: Some("revoked".to_string()),
        expires_at: 1_000,
    };
    client.token_manager().restore(revoked.clone()).await;

    let error = client.orders().list(&[]).await.unwrap_err();
    assert!(error.is_authentication());
    assert_eq!(error.to_string(), "Authentication failed: Invalid refresh token");
    assert_eq!(client.token_manager().state().await, revoked);

    // Caller-side recovery: discard the refresh token and log in again
    client.token_manager().clear_refresh_token().await;
    client.orders().list(&[]).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_calls_share_one_login() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "refresh_token": "refresh-1",
                    "token": "access-1",
                    "expires_at": 1_000
                }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_orders_for(&mock_server, "access-1", 3).await;

    let client = client_with_clock(&mock_server, ManualClock::at(0));
    let clone = client.clone();

    let (a, b, c) = tokio::join!(
        client.orders().list(&[]),
        clone.orders().list(&[]),
        client.orders().list(&[]),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(c.is_ok());
}

#[tokio::test]
async fn test_explicit_obtain_access_token_refreshes_with_scoping_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/refresh"))
        .and(body_json(json!({"refresh_token": "held"})))
        .and(header("X-Customer-Code", "CUST01"))
        .and(header("X-Wms-Code", "WMS01"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "next",
            "token": "fresh",
            "expires_at": 500
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EwhsClient::with_clock(
        ClientConfig::new("api-user", "secret")
            .with_api_url(mock_server.uri())
            .with_customer_code("CUST01")
            .with_wms_code("WMS01"),
        ManualClock::at(0),
    )
    .unwrap();
    client
        .token_manager()
        .restore(TokenState {
            access_token: Some("current".to_string()),
            refresh_token: Some("held".to_string()),
            expires_at: 400,
        })
        .await;

    let token = client.obtain_access_token().await.unwrap();
    assert_eq!(token, "fresh");
    assert_eq!(client.token_manager().state().await.refresh_token.as_deref(), Some("next"));
}

#[tokio::test]
async fn test_explicit_obtain_access_token_logs_in_with_scoping_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wms/auth/login"))
        .and(header("X-Customer-Code", "CUST01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "refresh_token": "refresh-1",
            "token": "access-1",
            "expires_at": 1_000
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EwhsClient::with_clock(
        ClientConfig::new("api-user", "secret")
            .with_api_url(mock_server.uri())
            .with_customer_code("CUST01"),
        ManualClock::at(0),
    )
    .unwrap();

    assert_eq!(client.obtain_access_token().await.unwrap(), "access-1");
}
