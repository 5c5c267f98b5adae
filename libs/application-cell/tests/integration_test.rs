use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use application_cell::router::application_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestUser};

fn test_config(store_url: &str) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = store_url.to_string();
    config
}

fn app(config: &AppConfig) -> Router {
    application_routes(Arc::new(config.clone()))
}

fn bearer(user: &TestUser, config: &AppConfig) -> String {
    format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(24))
    )
}

fn submission_body() -> serde_json::Value {
    json!({
        "name": "Asha Rao",
        "email": "asha.rao@example.com",
        "specialty": "Cardiology",
        "experience": 9,
        "license_number": "APMC123456",
        "living_place": "Hyderabad",
        "languages": ["Telugu", "English"],
        "license_image": {
            "content_type": "image/png",
            "data": BASE64.encode(b"png-bytes")
        }
    })
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_submit_uploads_license_then_stores_pending_application() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("asha.rao@example.com");

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/licenses/{}.png", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "licenses" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/applications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::application_row(&doctor.id, "pending")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&doctor, &config))
                .header("content-type", "application/json")
                .body(Body::from(submission_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["application"]["status"], "pending");
}

#[tokio::test]
async fn test_submit_with_negative_experience_writes_nothing() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("asha.rao@example.com");

    // No mocks mounted: any upload or store call would 404 and the
    // handler would answer 502 instead of 400.
    let mut body = submission_body();
    body["experience"] = json!(-1);

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&doctor, &config))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_requires_doctor_role() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let patient = TestUser::patient("p@example.com");

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("authorization", bearer(&patient, &config))
                .header("content-type", "application/json")
                .body(Body::from(submission_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_is_admin_only() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("d@example.com");

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .header("authorization", bearer(&doctor, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_lists_all_applications() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::application_row("doc-1", "pending"),
            MockStoreResponses::application_row("doc-2", "approved"),
        ])))
        .mount(&mock_server)
        .await;

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .header("authorization", bearer(&admin, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["applications"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_sets_status_idempotently() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/rest/v1/applications$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::application_row("doc-1", "rejected")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/doc-1/status")
                .header("authorization", bearer(&admin, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "rejected" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["application"]["status"], "rejected");
}

#[tokio::test]
async fn test_set_status_rejects_pending() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/doc-1/status")
                .header("authorization", bearer(&admin, &config))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "pending" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Rejected application, reapply, fresh submission: the record returns to
/// pending and the rejected data is fully overwritten.
#[tokio::test]
async fn test_reapply_then_resubmit_overwrites_rejected_data() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("asha.rao@example.com");

    let blank = json!([{
        "id": doctor.id,
        "name": "",
        "email": "",
        "specialty": "",
        "experience": 0,
        "license_number": "",
        "license_image_url": "",
        "living_place": "",
        "languages": [],
        "status": "pending"
    }]);

    Mock::given(method("POST"))
        .and(path("/rest/v1/applications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(blank))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reapply")
                .header("authorization", bearer(&doctor, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["application"]["status"], "pending");
    assert_eq!(body["application"]["name"], "");
}

#[tokio::test]
async fn test_status_defaults_to_pending_when_never_submitted() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let doctor = TestUser::doctor("new-doc@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app(&config)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/status")
                .header("authorization", bearer(&doctor, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["submitted"], false);
}
