use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path};

use auth_cell::router::auth_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils};

fn create_test_app(config: AppConfig) -> Router {
    auth_routes(Arc::new(config))
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_signup_creates_account_and_role_row() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let user_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "email": "new@example.com"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": user_id, "role": "doctor" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("/signup", json!({
            "email": "new@example.com",
            "password": "secret123",
            "role": "doctor"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["role"], "doctor");
}

#[tokio::test]
async fn test_signup_rejects_unknown_role_without_provider_call() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    // No mocks mounted: a provider call would fail loudly.
    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("/signup", json!({
            "email": "new@example.com",
            "password": "secret123",
            "role": "superuser"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_returns_provider_session() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "token_type": "bearer",
            "user": { "id": Uuid::new_v4(), "email": "p@example.com" }
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("/login", json!({
            "email": "p@example.com",
            "password": "secret123"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["access_token"], "abc");
}

#[tokio::test]
async fn test_login_maps_provider_rejection_to_unauthorized() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("/login", json!({
            "email": "p@example.com",
            "password": "wrong"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_password_sends_recovery_email() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(json_request("/reset-password", json!({
            "email": "p@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_validate_endpoint_round_trip() {
    let config = TestConfig::default().to_app_config();
    let user = TestUser::patient("test@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/validate")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user_id"], user.id);
}
