//! Integration tests: identity confirmation over HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use warden_session::{
    ConfirmationError, HttpConfirmer, HttpConfirmerConfig, IdentityConfirmer, LifecycleState,
    SessionConfig, SessionController, TracingNavigator,
};
use warden_store::{MemoryStore, TokenStore};
use warden_timer::{ExpiryScheduler, ManualClock};
use warden_token::encode_unsigned;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn confirmer(server: &MockServer) -> HttpConfirmer {
    HttpConfirmer::new(&HttpConfirmerConfig::new(server.uri())).unwrap()
}

#[tokio::test]
async fn test_confirm_sends_bearer_and_parses_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer h.p.s"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"role": "admin", "email": "boss@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let identity = confirmer(&server).confirm("h.p.s").await.unwrap();

    assert_eq!(identity.role.as_deref(), Some("admin"));
    assert_eq!(identity.email.as_deref(), Some("boss@example.com"));
    assert_eq!(identity.name, None);
}

#[tokio::test]
async fn test_confirm_unauthorized_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = confirmer(&server).confirm("h.p.s").await.unwrap_err();

    assert!(matches!(err, ConfirmationError::Status(401)), "got {err:?}");
}

#[tokio::test]
async fn test_confirm_non_json_body_is_body_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = confirmer(&server).confirm("h.p.s").await.unwrap_err();

    assert!(matches!(err, ConfirmationError::Body(_)), "got {err:?}");
}

#[tokio::test]
async fn test_confirm_unreachable_is_transport_error() {
    let config = HttpConfirmerConfig {
        timeout: Duration::from_secs(2),
        ..HttpConfirmerConfig::new("http://127.0.0.1:1")
    };

    let err = HttpConfirmer::new(&config)
        .unwrap()
        .confirm("h.p.s")
        .await
        .unwrap_err();

    assert!(matches!(err, ConfirmationError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_controller_persists_role_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "admin"})))
        .mount(&server)
        .await;
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let store = TokenStore::new(Arc::new(MemoryStore::new()));
    store
        .set_token(&encode_unsigned(
            &json!({"role": "employee", "exp": 1_700_003_600}),
        ))
        .unwrap();
    let controller = SessionController::new(
        store.clone(),
        ExpiryScheduler::with_defaults(clock),
        confirmer(&server),
        Arc::new(TracingNavigator),
        SessionConfig::default(),
    );

    let state = controller.activate().await;

    assert!(state.is_active());
    assert_eq!(store.role().as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_controller_clears_on_server_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let store = TokenStore::new(Arc::new(MemoryStore::new()));
    store
        .set_token(&encode_unsigned(&json!({"role": "employee"})))
        .unwrap();
    let controller = SessionController::new(
        store.clone(),
        ExpiryScheduler::with_defaults(Arc::new(ManualClock::at_secs(0))),
        confirmer(&server),
        Arc::new(TracingNavigator),
        SessionConfig::default(),
    );

    assert_eq!(controller.activate().await, LifecycleState::Unauthenticated);
    assert_eq!(store.get(), None);
}
