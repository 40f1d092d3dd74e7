//! Session validation probe.
//!
//! Confirms a cookie set still grants dashboard access with one cheap GET
//! instead of a full browser login. The probe never errors toward the
//! caller: any network failure or unexpected response simply means the
//! cookies are not valid.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, info, instrument, warn};

use super::CookieMap;
use crate::api::RequestHeaders;
use crate::config::{LOGGED_IN_MARKERS, PROBE_TIMEOUT_SECS};

/// Decides whether a candidate cookie set still grants access.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    /// Returns true when the cookies are accepted by the dashboard.
    async fn is_session_valid(&self, cookies: &CookieMap, base_headers: &RequestHeaders) -> bool;
}

/// Probe implementation that issues a GET against the dashboard root with
/// redirects disabled.
#[derive(Debug, Clone)]
pub struct DashboardProbe {
    client: Client,
    probe_url: String,
}

impl DashboardProbe {
    /// Creates a probe against the given dashboard URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(probe_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            probe_url: probe_url.into(),
        }
    }
}

#[async_trait]
impl SessionProbe for DashboardProbe {
    #[instrument(level = "debug", skip_all, fields(url = %self.probe_url))]
    async fn is_session_valid(&self, cookies: &CookieMap, base_headers: &RequestHeaders) -> bool {
        if cookies.is_empty() {
            debug!("no cookies provided for validation");
            return false;
        }

        let mut headers = base_headers.clone();
        headers.set_cookies(cookies);

        let response = match self
            .client
            .get(&self.probe_url)
            .headers(headers.to_header_map())
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "validation probe request failed");
                return false;
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            if LOGGED_IN_MARKERS.iter().any(|marker| body.contains(marker)) {
                info!("session cookies are valid");
                return true;
            }
            debug!("200 response without logged-in markers; treating as invalid");
            return false;
        }

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("");
            if location.contains("login") || location.contains("oauth") {
                info!(%location, "probe bounced to the auth flow; cookies invalid");
            } else {
                debug!(%location, status = status.as_u16(), "unexpected probe redirect");
            }
            return false;
        }

        debug!(status = status.as_u16(), "unexpected probe status");
        false
    }
}
