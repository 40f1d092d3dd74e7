//! Integration tests for the API client's bounded auth retry against a live
//! stub server.

mod support;

use std::sync::Arc;

use provisioner_core::{ApiClient, ApiError, ApiMethod, DEFAULT_MAX_ATTEMPTS, RequestHeaders};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stale_headers() -> RequestHeaders {
    let mut headers = RequestHeaders::empty();
    headers.set_cookies(&support::cookies("stale"));
    headers
}

#[tokio::test]
async fn test_auth_failure_refreshes_cookies_and_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations"))
        .and(header("cookie", "token=stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/organizations"))
        .and(header("cookie", "token=fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "org_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(support::manager_yielding(&dir, support::cookies("fresh")));
    let mut headers = stale_headers();

    let response = client
        .call(
            &format!("{}/organizations", server.uri()),
            ApiMethod::Post,
            Some(&serde_json::json!({"name": "acme"})),
            &mut headers,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await
        .unwrap();

    assert_eq!(response["id"], "org_1");
    assert_eq!(
        headers.get("cookie"),
        Some("token=fresh"),
        "refresh must rewrite the shared cookie header in place"
    );
}

#[tokio::test]
async fn test_auth_failure_gives_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(support::manager_yielding(&dir, support::cookies("fresh")));
    let mut headers = stale_headers();

    let error = client
        .call(
            &format!("{}/organizations", server.uri()),
            ApiMethod::Post,
            None,
            &mut headers,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await
        .unwrap_err();

    match error {
        ApiError::HttpStatus { status, .. } => assert_eq!(status, 403),
        other => panic!("expected HttpStatus, got: {other}"),
    }
}

#[tokio::test]
async fn test_non_auth_error_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(support::manager_yielding(&dir, support::cookies("fresh")));
    let mut headers = stale_headers();

    let error = client
        .call(
            &format!("{}/organizations", server.uri()),
            ApiMethod::Post,
            None,
            &mut headers,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await
        .unwrap_err();

    match error {
        ApiError::HttpStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected HttpStatus, got: {other}"),
    }
    assert_eq!(
        headers.get("cookie"),
        Some("token=stale"),
        "non-auth failures must not touch the cookie header"
    );
}

#[tokio::test]
async fn test_get_payload_becomes_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("name", "acme"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(support::manager_yielding(&dir, support::cookies("fresh")));
    let mut headers = stale_headers();

    let response = client
        .call(
            &format!("{}/projects", server.uri()),
            ApiMethod::Get,
            Some(&serde_json::json!({"name": "acme", "limit": 5})),
            &mut headers,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await
        .unwrap();

    assert_eq!(response["ok"], true);
}
