//! Authenticated dashboard API client with bounded auth retry.
//!
//! A 401/403 response triggers one cookie refresh through the
//! [`CookieManager`] and a retry, capped at `max_attempts` total attempts.
//! The refresh rewrites the `cookie` field on the caller-supplied
//! [`RequestHeaders`] in place, so later calls sharing the same header set
//! pick up the new session too.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::headers::RequestHeaders;
use crate::auth::CookieManager;
use crate::config::{API_CONNECT_TIMEOUT_SECS, API_READ_TIMEOUT_SECS};

/// Default total attempts per call (one initial try plus one auth retry).
pub const DEFAULT_MAX_ATTEMPTS: usize = 2;

/// Supported HTTP methods.
///
/// The dashboard API is consumed with GET (payload as query parameters) and
/// POST (payload as JSON body) only; anything else would be a configuration
/// error, so it is simply not representable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    /// GET with the payload flattened into query parameters.
    Get,
    /// POST with the payload as a JSON body.
    Post,
}

impl ApiMethod {
    fn as_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
        }
    }
}

/// Errors that can occur during an API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level error (DNS, connection, TLS, timeout).
    #[error("request to {url} failed: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP response, after any auth retry was exhausted.
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body (truncated) for diagnostics.
        body: String,
    },

    /// The success response body was not valid JSON.
    #[error("invalid JSON in response from {url}: {source}")]
    InvalidJson {
        /// The URL whose response failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: reqwest::Error,
    },
}

/// Cookie-authenticated JSON API client.
pub struct ApiClient {
    client: Client,
    auth: Arc<CookieManager>,
}

impl ApiClient {
    /// Creates a client backed by the given cookie manager.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(auth: Arc<CookieManager>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(API_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(API_READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client, auth }
    }

    /// Performs an authenticated API call with the bounded auth retry.
    ///
    /// On 401/403 with attempts remaining, refreshes cookies via the cookie
    /// manager, rewrites `headers`' cookie field in place, and retries.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, any non-auth error status,
    /// or an auth error status once attempts are exhausted.
    #[instrument(level = "debug", skip(self, payload, headers), fields(url = %url))]
    pub async fn call(
        &self,
        url: &str,
        method: ApiMethod,
        payload: Option<&Value>,
        headers: &mut RequestHeaders,
        max_attempts: usize,
    ) -> Result<Value, ApiError> {
        let max_attempts = max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, ?method, "API call attempt");

            let mut request = self
                .client
                .request(method.as_reqwest(), url)
                .headers(headers.to_header_map());
            request = match (method, payload) {
                (ApiMethod::Get, Some(value)) => request.query(&query_pairs(value)),
                (ApiMethod::Post, Some(value)) => request.json(value),
                (_, None) => request,
            };

            let response = request.send().await.map_err(|source| ApiError::Network {
                url: url.to_string(),
                source,
            })?;

            let status = response.status();
            if status.is_success() {
                return response.json().await.map_err(|source| ApiError::InvalidJson {
                    url: url.to_string(),
                    source,
                });
            }

            let auth_failure = matches!(status.as_u16(), 401 | 403);
            if auth_failure && attempt < max_attempts {
                warn!(
                    status = status.as_u16(),
                    "authentication failure; refreshing cookies before retry"
                );
                if let Some(cookies) = self.auth.get_active_cookies(headers).await {
                    headers.set_cookies(&cookies);
                    info!("cookies refreshed; retrying API call");
                    continue;
                }
                warn!("cookie refresh failed; cannot retry API call");
            }

            let body = truncated_body(response).await;
            return Err(ApiError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        // The loop always returns: success, error status, or exhausted auth
        // retry on its final attempt.
        unreachable!("API call loop exited without a result")
    }
}

/// Flattens a JSON object into string query pairs. Non-object payloads yield
/// no parameters; nested values are serialized compactly.
fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    match payload {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Reads the response body for diagnostics, truncated to keep logs sane.
pub(crate) async fn truncated_body(response: reqwest::Response) -> String {
    const LIMIT: usize = 500;
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > LIMIT {
        let mut cut = LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_renders_strings_bare() {
        let payload = serde_json::json!({"name": "acme", "limit": 5, "flag": true});
        let mut pairs = query_pairs(&payload);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("flag".to_string(), "true".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("name".to_string(), "acme".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_non_object_payload_is_empty() {
        assert!(query_pairs(&serde_json::json!(["a", "b"])).is_empty());
        assert!(query_pairs(&serde_json::json!("plain")).is_empty());
    }

    #[test]
    fn test_api_method_maps_to_reqwest() {
        assert_eq!(ApiMethod::Get.as_reqwest(), Method::GET);
        assert_eq!(ApiMethod::Post.as_reqwest(), Method::POST);
    }
}
