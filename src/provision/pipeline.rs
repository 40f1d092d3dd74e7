//! Sequential provisioning pipeline.
//!
//! Runs organization -> token -> project -> deployment, threading each step's
//! identifier into the next through an explicit [`PipelineState`]. A failed
//! step logs its error and leaves its state field empty; later steps that
//! depend on a missing identifier are skipped, never crashed. The first two
//! steps go through the cookie-authenticated dashboard API (with its auth
//! retry); project and deployment use the public deploy API with bearer auth.

use std::time::Duration;

use chrono::Local;
use rand::Rng;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::api::{ApiClient, ApiError, ApiMethod, DEFAULT_MAX_ATTEMPTS, RequestHeaders};
use crate::config::{API_CONNECT_TIMEOUT_SECS, API_READ_TIMEOUT_SECS, BROWSER_USER_AGENT};

use super::types::{Deployment, Organization, Project};

/// Errors from a single provisioning step.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The underlying API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The call succeeded but the response body had an unexpected shape.
    #[error("{operation} response had an unexpected shape: {detail}")]
    UnexpectedShape {
        /// The operation whose response could not be interpreted.
        operation: &'static str,
        /// What was wrong.
        detail: String,
    },
}

/// Results threaded between pipeline steps.
///
/// Replaces ad-hoc mutable globals: each step reads what it needs from here
/// and writes its own result, so the coupling between steps is explicit.
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Created organization, if step 1 succeeded.
    pub organization: Option<Organization>,
    /// Access token string, if step 2 succeeded.
    pub token: Option<String>,
    /// Created project, if step 3 succeeded.
    pub project: Option<Project>,
    /// Created deployment, if step 4 succeeded.
    pub deployment: Option<Deployment>,
}

/// Drives the four provisioning steps.
pub struct Provisioner {
    api: ApiClient,
    deploy_client: Client,
    dashboard_api_base: String,
    deploy_api_base: String,
}

impl Provisioner {
    /// Creates a provisioner over the given API client and base URLs.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(
        api: ApiClient,
        dashboard_api_base: impl Into<String>,
        deploy_api_base: impl Into<String>,
    ) -> Self {
        let deploy_client = Client::builder()
            .connect_timeout(Duration::from_secs(API_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(API_READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            api,
            deploy_client,
            dashboard_api_base: dashboard_api_base.into(),
            deploy_api_base: deploy_api_base.into(),
        }
    }

    /// Runs all steps, skipping those whose prerequisites are missing.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self, headers: &mut RequestHeaders) -> PipelineState {
        let mut state = PipelineState::default();

        match self.create_organization(headers).await {
            Ok(organization) => {
                info!(id = %organization.id, name = %organization.name, "organization created");
                state.organization = Some(organization);
            }
            Err(step_error) => error!(%step_error, "organization creation failed"),
        }

        if let Some(organization) = &state.organization {
            match self.create_token(&organization.id, headers).await {
                Ok(token) => {
                    info!(preview = %token_preview(&token), "access token created");
                    state.token = Some(token);
                }
                Err(step_error) => error!(%step_error, "token creation failed"),
            }
        } else {
            info!("skipping token creation: no organization id");
        }

        if let (Some(organization), Some(token)) = (&state.organization, &state.token) {
            match self.create_project(&organization.id, token).await {
                Ok(project) => {
                    info!(id = %project.id, name = %project.name, "project created");
                    state.project = Some(project);
                }
                Err(step_error) => error!(%step_error, "project creation failed"),
            }

            if let Some(project) = &state.project {
                match self.create_deployment(&project.id, token).await {
                    Ok(deployment) => {
                        info!(id = %deployment.id, "deployment created");
                        for url in public_urls(project, &deployment) {
                            info!(%url, "deployment URL");
                        }
                        state.deployment = Some(deployment);
                    }
                    Err(step_error) => error!(%step_error, "deployment failed"),
                }
            } else {
                info!("skipping deployment: project was not created");
            }
        } else {
            info!("skipping deploy API operations: missing organization id or access token");
        }

        state
    }

    /// Step 1: create an organization with a randomized name.
    async fn create_organization(
        &self,
        headers: &mut RequestHeaders,
    ) -> Result<Organization, ProvisionError> {
        let name = randomized_name("auto-org");
        info!(%name, "creating organization");

        let payload = serde_json::json!({
            "name": name,
            "subhostingEnabled": false,
        });
        let response = self
            .api
            .call(
                &format!("{}/organizations", self.dashboard_api_base),
                ApiMethod::Post,
                Some(&payload),
                headers,
                DEFAULT_MAX_ATTEMPTS,
            )
            .await?;

        serde_json::from_value(response).map_err(|parse_error| ProvisionError::UnexpectedShape {
            operation: "organization creation",
            detail: parse_error.to_string(),
        })
    }

    /// Step 2: create an access token scoped to the organization. The
    /// response is a single-element array holding the token string.
    async fn create_token(
        &self,
        organization_id: &str,
        headers: &mut RequestHeaders,
    ) -> Result<String, ProvisionError> {
        info!(%organization_id, "creating access token");

        let payload = serde_json::json!({
            "description": "auto_provision_token",
            "expiresAt": null,
        });
        let response = self
            .api
            .call(
                &format!(
                    "{}/organizations/{organization_id}/tokens",
                    self.dashboard_api_base
                ),
                ApiMethod::Post,
                Some(&payload),
                headers,
                DEFAULT_MAX_ATTEMPTS,
            )
            .await?;

        response
            .as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ProvisionError::UnexpectedShape {
                operation: "token creation",
                detail: "expected a single-element array containing the token string".to_string(),
            })
    }

    /// Step 3: create a deployment project (public deploy API, bearer auth).
    async fn create_project(
        &self,
        organization_id: &str,
        token: &str,
    ) -> Result<Project, ProvisionError> {
        let name = randomized_name("auto-deploy");
        info!(%name, %organization_id, "creating deployment project");

        let response = self
            .deploy_post(
                &format!(
                    "{}/organizations/{organization_id}/projects",
                    self.deploy_api_base
                ),
                token,
                &serde_json::json!({"name": name}),
            )
            .await?;

        serde_json::from_value(response).map_err(|parse_error| ProvisionError::UnexpectedShape {
            operation: "project creation",
            detail: parse_error.to_string(),
        })
    }

    /// Step 4: deploy a fixed single-file "hello world" server.
    async fn create_deployment(
        &self,
        project_id: &str,
        token: &str,
    ) -> Result<Deployment, ProvisionError> {
        info!(%project_id, "creating deployment");

        let content = format!(
            "Deno.serve((_req) => new Response(\"Hello, world! \
             Provisioned automatically at {}.\"));",
            Local::now()
        );
        let payload = serde_json::json!({
            "entryPointUrl": "main.ts",
            "assets": {
                "main.ts": {
                    "kind": "file",
                    "content": content,
                    "encoding": "utf-8",
                },
            },
            "envVars": {},
        });

        let response = self
            .deploy_post(
                &format!("{}/projects/{project_id}/deployments", self.deploy_api_base),
                token,
                &payload,
            )
            .await?;

        serde_json::from_value(response).map_err(|parse_error| ProvisionError::UnexpectedShape {
            operation: "deployment creation",
            detail: parse_error.to_string(),
        })
    }

    /// One-shot bearer-auth POST against the public deploy API. No cookie
    /// retry here: a bearer token either works or the step fails.
    async fn deploy_post(
        &self,
        url: &str,
        token: &str,
        payload: &Value,
    ) -> Result<Value, ApiError> {
        let response = self
            .deploy_client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .json(payload)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = crate::api::truncated_body(response).await;
            return Err(ApiError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|source| ApiError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }
}

/// Public URLs for a deployment, in reporting order: the project's primary
/// subdomain first, then deployment-specific domains, falling back to the
/// `{project}-{deployment}` subdomain when no domains were reported.
#[must_use]
pub fn public_urls(project: &Project, deployment: &Deployment) -> Vec<String> {
    let mut urls = vec![format!("https://{}.deno.dev", project.name)];
    if deployment.domains.is_empty() {
        urls.push(format!(
            "https://{}-{}.deno.dev",
            project.name, deployment.id
        ));
    } else {
        urls.extend(
            deployment
                .domains
                .iter()
                .map(|domain| format!("https://{domain}")),
        );
    }
    urls
}

fn randomized_name(prefix: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("{prefix}-{suffix}")
}

fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{prefix}...")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: "proj_1".to_string(),
            name: "auto-deploy-1234".to_string(),
        }
    }

    #[test]
    fn test_public_urls_with_reported_domains() {
        let deployment = Deployment {
            id: "dep_9".to_string(),
            domains: vec!["auto-deploy-1234-dep9.deno.dev".to_string()],
        };
        assert_eq!(
            public_urls(&project(), &deployment),
            vec![
                "https://auto-deploy-1234.deno.dev".to_string(),
                "https://auto-deploy-1234-dep9.deno.dev".to_string(),
            ]
        );
    }

    #[test]
    fn test_public_urls_fallback_without_domains() {
        let deployment = Deployment {
            id: "dep_9".to_string(),
            domains: Vec::new(),
        };
        assert_eq!(
            public_urls(&project(), &deployment),
            vec![
                "https://auto-deploy-1234.deno.dev".to_string(),
                "https://auto-deploy-1234-dep_9.deno.dev".to_string(),
            ]
        );
    }

    #[test]
    fn test_randomized_name_shape() {
        let name = randomized_name("auto-org");
        let suffix = name.strip_prefix("auto-org-").expect("prefix");
        let value: u16 = suffix.parse().expect("numeric suffix");
        assert!((1000..10000).contains(&value));
    }

    #[test]
    fn test_token_preview_truncates() {
        assert_eq!(token_preview("ddp_0123456789abcdef"), "ddp_012345...");
        assert_eq!(token_preview("short"), "short...");
    }
}
