//! Fixed endpoints, session-cookie names, login credentials, and timeouts.
//!
//! Everything here is hard-coded to one dashboard's login and API shape by
//! design; this tool is not a general auth library.

use std::env;

/// Dashboard login page (entry point for the OAuth flow).
pub const LOGIN_URL: &str = "https://dash.deno.com/login?redirect=%2F";

/// Dashboard "who am I" endpoint. Declared for completeness; no operation
/// calls it directly today.
pub const ME_API_URL: &str = "https://dash.deno.com/_api/me";

/// Dashboard root, used as the lightweight session validation probe target.
pub const DASHBOARD_URL: &str = "https://dash.deno.com/";

/// Dashboard host; a login is complete once the browser lands back here.
pub const DASHBOARD_DOMAIN: &str = "dash.deno.com";

/// Private dashboard API base (cookie-authenticated).
pub const DASHBOARD_API_BASE: &str = "https://dash.deno.com/_api";

/// Public deployment API base (bearer-authenticated).
pub const DEPLOY_API_BASE: &str = "https://api.deno.com/v1";

/// Domain suffix a captured cookie must belong to.
pub const COOKIE_DOMAIN: &str = "deno.com";

/// Cookie names worth persisting from a completed login.
pub const SESSION_COOKIE_NAMES: &[&str] = &["token", "deno_auth_ghid", "deno_auth"];

/// At least one of these must be present for a cookie set to count as a
/// session. A login that "succeeds" without them is treated as a failure.
pub const REQUIRED_COOKIE_NAMES: &[&str] = &["token", "deno_auth_ghid"];

/// Body substrings that indicate a logged-in dashboard response.
pub const LOGGED_IN_MARKERS: &[&str] = &["Welcome back", "Sign out", "Dashboard", "Your projects"];

/// Browser User-Agent shared by the headless browser context, the validation
/// probe, and API calls so all traffic presents the same client profile.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Validation probe timeout in seconds (short; a slow probe is an invalid one).
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// API call connect timeout in seconds.
pub const API_CONNECT_TIMEOUT_SECS: u64 = 30;

/// API call read timeout in seconds.
pub const API_READ_TIMEOUT_SECS: u64 = 60;

/// Environment variable supplying the GitHub username.
pub const GITHUB_USER_ENV: &str = "DENO_GH_USER";

/// Environment variable supplying the GitHub password.
pub const GITHUB_PASS_ENV: &str = "DENO_GH_PASS";

// Placeholder defaults. Real deployments must override both env vars; the
// login flow refuses to run while either placeholder is still in effect.
const PLACEHOLDER_USERNAME: &str = "your_github_username@example.com";
const PLACEHOLDER_PASSWORD: &str = "your_github_password";

/// GitHub login credentials for the OAuth flow.
///
/// The password is intentionally excluded from `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    /// GitHub account username or email.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from explicit values.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads credentials from `DENO_GH_USER` / `DENO_GH_PASS`, falling back
    /// to the documented placeholder values when unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            username: env::var(GITHUB_USER_ENV).unwrap_or_else(|_| PLACEHOLDER_USERNAME.into()),
            password: env::var(GITHUB_PASS_ENV).unwrap_or_else(|_| PLACEHOLDER_PASSWORD.into()),
        }
    }

    /// Returns the password.
    ///
    /// Sensitive - avoid logging the return value.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// True when either value is still a placeholder default. The login flow
    /// refuses to touch the browser in that case.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.username == PLACEHOLDER_USERNAME || self.password == PLACEHOLDER_PASSWORD
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
