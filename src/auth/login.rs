//! Browser-driven GitHub OAuth login flow.
//!
//! Drives headless Chrome through the dashboard's "Continue with GitHub"
//! flow: navigate, hand off to GitHub, fill credentials if prompted, approve
//! the OAuth grant if prompted, then wait for the dashboard redirect and
//! harvest the session cookies. Every stage has a bounded timeout and a
//! best-effort diagnostic screenshot on failure; the flow as a whole never
//! propagates an error past [`LoginFlow::acquire_session`] - a failed login
//! is simply "no cookies".
//!
//! One invocation performs exactly one login attempt; retrying is the
//! caller's decision.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::CookieMap;
use crate::config::{
    BROWSER_USER_AGENT, COOKIE_DOMAIN, Credentials, DASHBOARD_DOMAIN, LOGIN_URL,
    REQUIRED_COOKIE_NAMES, SESSION_COOKIE_NAMES,
};

/// Initial navigation to the login page.
const NAVIGATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Waiting for the GitHub button to become visible and enabled.
const BUTTON_READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Click plus the navigation it triggers.
const OAUTH_HANDOFF_TIMEOUT: Duration = Duration::from_secs(30);

/// Filling and submitting the GitHub credential form.
const CREDENTIAL_STAGE_TIMEOUT: Duration = Duration::from_secs(45);

/// Clicking the OAuth authorize control.
const AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// Waiting for the final redirect back onto the dashboard.
const DASHBOARD_REDIRECT_TIMEOUT: Duration = Duration::from_secs(45);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Checks the GitHub hand-off button is present, visible, and enabled.
const GITHUB_BUTTON_READY_JS: &str = r"
(() => {
  const button = Array.from(document.querySelectorAll('button'))
    .find((el) => el.textContent.includes('Continue with GitHub'));
  return Boolean(button) && !button.disabled && button.offsetParent !== null;
})()
";

/// Clicks the GitHub hand-off button; returns whether a click happened.
const GITHUB_BUTTON_CLICK_JS: &str = r"
(() => {
  const button = Array.from(document.querySelectorAll('button'))
    .find((el) => el.textContent.includes('Continue with GitHub'));
  if (!button || button.disabled) return false;
  button.click();
  return true;
})()
";

/// Errors that can occur while driving the browser login.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Credentials were left at their placeholder defaults.
    #[error("GitHub credentials are unset or still placeholder values")]
    PlaceholderCredentials,

    /// The browser configuration could not be built.
    #[error("failed to configure browser: {0}")]
    BrowserSetup(String),

    /// Underlying Chrome DevTools protocol error.
    #[error("browser automation error: {0}")]
    Cdp(#[from] CdpError),

    /// A login stage exceeded its timeout.
    #[error("login stage '{stage}' timed out")]
    StageTimeout {
        /// The stage that timed out.
        stage: &'static str,
    },

    /// The GitHub hand-off button never clicked.
    #[error("'Continue with GitHub' control could not be clicked")]
    HandoffClickFailed,

    /// The flow finished but no required session cookie was captured.
    #[error("login completed but required session cookies are missing")]
    MissingSessionCookies,
}

/// Obtains fresh session cookies, one attempt per call.
#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Returns fresh cookies, or `None` when the login failed for any reason.
    async fn acquire_session(&self) -> Option<CookieMap>;
}

/// Headless-Chrome implementation of the GitHub OAuth login.
#[derive(Debug)]
pub struct GithubOauthLogin {
    credentials: Credentials,
    screenshot_dir: PathBuf,
}

impl GithubOauthLogin {
    /// Creates a login flow with the given credentials; diagnostic
    /// screenshots land in `screenshot_dir`.
    #[must_use]
    pub fn new(credentials: Credentials, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    async fn run_flow(&self) -> Result<CookieMap, LoginError> {
        // Stage-0 guard: never start a browser with placeholder credentials.
        if self.credentials.is_placeholder() {
            return Err(LoginError::PlaceholderCredentials);
        }

        let config = BrowserConfig::builder()
            .arg(format!("--user-agent={BROWSER_USER_AGENT}"))
            .build()
            .map_err(LoginError::BrowserSetup)?;
        let (mut browser, mut handler) = Browser::launch(config).await?;
        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = self.drive(&browser).await;

        if let Err(close_error) = browser.close().await {
            debug!(%close_error, "browser close reported an error");
        }
        event_task.abort();
        outcome
    }

    async fn drive(&self, browser: &Browser) -> Result<CookieMap, LoginError> {
        let page = browser.new_page("about:blank").await?;

        if let Err(stage_error) = self.navigate(&page).await {
            self.screenshot(&page, "error_login_navigate").await;
            return Err(stage_error);
        }

        if let Err(stage_error) = self.trigger_oauth(&page).await {
            self.screenshot(&page, "error_github_button").await;
            return Err(stage_error);
        }

        let url = current_url(&page).await?;
        debug!(%url, "URL after GitHub hand-off");
        if needs_credential_stage(&url) {
            if let Err(stage_error) = self.submit_credentials(&page).await {
                self.screenshot(&page, "error_github_login").await;
                return Err(stage_error);
            }
        } else {
            debug!("skipping GitHub login form (already authenticated or on authorize step)");
        }

        let url = current_url(&page).await?;
        if is_authorize_stage(&url) {
            // Click failure here is a warning, not fatal: the grant may
            // already be approved and the redirect can still complete.
            if let Err(stage_error) = self.authorize(&page).await {
                warn!(%stage_error, "authorize click failed; waiting for redirect anyway");
                self.screenshot(&page, "error_github_authorize").await;
            }
        }

        if let Err(stage_error) = self.await_dashboard(&page).await {
            self.screenshot(&page, "error_dashboard_redirect").await;
            return Err(stage_error);
        }

        let raw_cookies = page.get_cookies().await?;
        let cookies = filter_session_cookies(
            raw_cookies
                .into_iter()
                .map(|cookie| (cookie.domain, cookie.name, cookie.value)),
        );

        // A "successful" flow with an empty session is still a failure.
        if !has_required_session(&cookies) {
            self.screenshot(&page, "warning_missing_session_cookies").await;
            return Err(LoginError::MissingSessionCookies);
        }

        info!(count = cookies.len(), "extracted session cookies");
        Ok(cookies)
    }

    async fn navigate(&self, page: &Page) -> Result<(), LoginError> {
        info!(url = LOGIN_URL, "navigating to dashboard login page");
        stage_timeout("navigate", NAVIGATE_TIMEOUT, async {
            page.goto(LOGIN_URL).await?;
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn trigger_oauth(&self, page: &Page) -> Result<(), LoginError> {
        info!("waiting for 'Continue with GitHub' control");
        poll_js(page, GITHUB_BUTTON_READY_JS, "github_button", BUTTON_READY_TIMEOUT).await?;

        info!("clicking 'Continue with GitHub'");
        stage_timeout("oauth_handoff", OAUTH_HANDOFF_TIMEOUT, async {
            if !eval_bool(page, GITHUB_BUTTON_CLICK_JS).await? {
                return Err(LoginError::HandoffClickFailed);
            }
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn submit_credentials(&self, page: &Page) -> Result<(), LoginError> {
        info!("filling GitHub credential form");
        stage_timeout("github_credentials", CREDENTIAL_STAGE_TIMEOUT, async {
            page.find_element("input#login_field")
                .await?
                .click()
                .await?
                .type_str(&self.credentials.username)
                .await?;
            page.find_element("input#password")
                .await?
                .click()
                .await?
                .type_str(self.credentials.password())
                .await?;
            page.find_element(r#"input[type="submit"][name="commit"]"#)
                .await?
                .click()
                .await?;
            page.wait_for_navigation().await?;
            Ok(())
        })
        .await
    }

    async fn authorize(&self, page: &Page) -> Result<(), LoginError> {
        info!("on GitHub authorization page");
        stage_timeout("github_authorize", AUTHORIZE_TIMEOUT, async {
            // Two candidate selectors; first match wins.
            let button = match page
                .find_element(r#"button[type="submit"][name="authorize"]"#)
                .await
            {
                Ok(element) => Some(element),
                Err(_) => page.find_element("button#js-oauth-authorize-btn").await.ok(),
            };

            match button {
                Some(element) => {
                    element.click().await?;
                    page.wait_for_navigation().await?;
                    info!("clicked authorize");
                }
                None => {
                    debug!("authorize button not found; assuming already authorized");
                }
            }
            Ok(())
        })
        .await
    }

    async fn await_dashboard(&self, page: &Page) -> Result<(), LoginError> {
        info!("waiting for redirect back to the dashboard");
        let deadline = Instant::now() + DASHBOARD_REDIRECT_TIMEOUT;
        loop {
            let url = current_url(page).await?;
            if is_dashboard_landing(&url) {
                info!(%url, "redirected to dashboard");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(LoginError::StageTimeout {
                    stage: "dashboard_redirect",
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Best-effort diagnostic screenshot; never affects control flow.
    async fn screenshot(&self, page: &Page, name: &str) {
        let path = self.screenshot_dir.join(format!("{name}.png"));
        match page
            .save_screenshot(
                ScreenshotParams::builder().full_page(true).build(),
                &path,
            )
            .await
        {
            Ok(_) => info!(path = %path.display(), "diagnostic screenshot captured"),
            Err(shot_error) => warn!(%shot_error, "failed to capture diagnostic screenshot"),
        }
    }
}

#[async_trait]
impl LoginFlow for GithubOauthLogin {
    #[instrument(level = "info", skip(self))]
    async fn acquire_session(&self) -> Option<CookieMap> {
        match self.run_flow().await {
            Ok(cookies) => Some(cookies),
            Err(flow_error) => {
                error!(%flow_error, "browser login failed");
                None
            }
        }
    }
}

async fn stage_timeout<T>(
    stage: &'static str,
    limit: Duration,
    operation: impl Future<Output = Result<T, LoginError>>,
) -> Result<T, LoginError> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| LoginError::StageTimeout { stage })?
}

async fn poll_js(
    page: &Page,
    script: &'static str,
    stage: &'static str,
    limit: Duration,
) -> Result<(), LoginError> {
    let deadline = Instant::now() + limit;
    loop {
        if eval_bool(page, script).await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(LoginError::StageTimeout { stage });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn eval_bool(page: &Page, script: &'static str) -> Result<bool, LoginError> {
    let evaluation = page.evaluate(script).await?;
    Ok(evaluation.into_value::<bool>().unwrap_or(false))
}

async fn current_url(page: &Page) -> Result<String, LoginError> {
    Ok(page.url().await?.unwrap_or_default())
}

/// The GitHub credential form is only filled on the login page proper, not
/// when the flow skipped straight to the authorize step.
fn needs_credential_stage(url: &str) -> bool {
    url.contains("github.com/login") && !url.contains("oauth/authorize")
}

fn is_authorize_stage(url: &str) -> bool {
    url.contains("github.com/login/oauth/authorize")
}

/// Login is complete once the browser is back on the dashboard domain and
/// the URL mentions neither a login page nor an error.
fn is_dashboard_landing(url: &str) -> bool {
    url.contains(DASHBOARD_DOMAIN) && !url.contains("login") && !url.contains("error")
}

/// Keeps only allow-listed session cookies scoped to the target domain.
fn filter_session_cookies<I>(cookies: I) -> CookieMap
where
    I: IntoIterator<Item = (String, String, String)>,
{
    cookies
        .into_iter()
        .filter(|(domain, name, _)| {
            domain.contains(COOKIE_DOMAIN) && SESSION_COOKIE_NAMES.contains(&name.as_str())
        })
        .map(|(_, name, value)| (name, value))
        .collect()
}

/// True when at least one required session-identifying cookie is present.
fn has_required_session(cookies: &CookieMap) -> bool {
    REQUIRED_COOKIE_NAMES
        .iter()
        .any(|name| cookies.contains_key(*name))
}
