//! Integration tests for the provisioning pipeline: identifier threading
//! between steps and skip-on-failure behavior, against a stub server playing
//! both the dashboard API and the public deploy API.

mod support;

use provisioner_core::provision::public_urls;
use provisioner_core::{ApiClient, Provisioner, RequestHeaders};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provisioner_for(server: &MockServer, dir: &TempDir) -> Provisioner {
    let api = ApiClient::new(support::manager_yielding(dir, support::cookies("fresh")));
    Provisioner::new(
        api,
        format!("{}/_api", server.uri()),
        format!("{}/v1", server.uri()),
    )
}

fn session_headers() -> RequestHeaders {
    let mut headers = RequestHeaders::empty();
    headers.set_cookies(&support::cookies("fresh"));
    headers
}

#[tokio::test]
async fn test_full_pipeline_threads_identifiers_between_steps() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_api/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "org_123",
            "name": "auto-org-4242",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_api/organizations/org_123/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["tok_abc"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/organizations/org_123/projects"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "proj_1",
            "name": "auto-deploy-1234",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/proj_1/deployments"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "dep_9",
            "domains": ["auto-deploy-1234-dep9.deno.dev"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let provisioner = provisioner_for(&server, &dir);
    let mut headers = session_headers();

    let state = provisioner.run(&mut headers).await;

    let organization = state.organization.unwrap();
    assert_eq!(organization.id, "org_123");
    assert_eq!(state.token.as_deref(), Some("tok_abc"));

    let project = state.project.unwrap();
    assert_eq!(project.id, "proj_1");
    let deployment = state.deployment.unwrap();
    assert_eq!(deployment.id, "dep_9");

    assert_eq!(
        public_urls(&project, &deployment),
        vec![
            "https://auto-deploy-1234.deno.dev".to_string(),
            "https://auto-deploy-1234-dep9.deno.dev".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_organization_failure_skips_every_later_step() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_api/organizations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/_api/organizations/[^/]+/tokens$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["tok"])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let provisioner = provisioner_for(&server, &dir);
    let mut headers = session_headers();

    let state = provisioner.run(&mut headers).await;

    assert!(state.organization.is_none());
    assert!(state.token.is_none());
    assert!(state.project.is_none());
    assert!(state.deployment.is_none());
}

#[tokio::test]
async fn test_unexpected_token_shape_skips_deploy_steps() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_api/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "org_123",
            "name": "auto-org-4242",
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Token endpoint answers with an object instead of the expected
    // single-element array.
    Mock::given(method("POST"))
        .and(path("/_api/organizations/org_123/tokens"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "tok_abc"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let provisioner = provisioner_for(&server, &dir);
    let mut headers = session_headers();

    let state = provisioner.run(&mut headers).await;

    assert!(state.organization.is_some());
    assert!(state.token.is_none());
    assert!(state.project.is_none());
    assert!(state.deployment.is_none());
}

#[tokio::test]
async fn test_project_failure_skips_deployment_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_api/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "org_123",
            "name": "auto-org-4242",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_api/organizations/org_123/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["tok_abc"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/organizations/org_123/projects"))
        .respond_with(ResponseTemplate::new(422).set_body_string("name taken"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/projects/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let provisioner = provisioner_for(&server, &dir);
    let mut headers = session_headers();

    let state = provisioner.run(&mut headers).await;

    assert!(state.organization.is_some());
    assert_eq!(state.token.as_deref(), Some("tok_abc"));
    assert!(state.project.is_none());
    assert!(state.deployment.is_none());
}
