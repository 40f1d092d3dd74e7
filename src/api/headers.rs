//! Mutable request header set with in-place cookie injection.
//!
//! The dashboard's private API expects a browser-like header profile. One
//! `RequestHeaders` instance is shared across a whole pipeline run; when the
//! session is refreshed mid-run, the `cookie` field is rewritten in place so
//! every later call picks up the new session automatically.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::auth::CookieMap;
use crate::config::BROWSER_USER_AGENT;

/// Header name used for the injected session cookie.
pub const COOKIE_HEADER: &str = "cookie";

/// A base header set plus an injected `cookie` field.
///
/// Stored as an ordered map of lowercase header names so the joined cookie
/// value and the emitted header set are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    headers: BTreeMap<String, String>,
}

impl RequestHeaders {
    /// Creates the browser-profile base header set used for dashboard calls.
    #[must_use]
    pub fn dashboard_base() -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in [
            ("accept", "application/json"),
            ("accept-language", "en-US,en;q=0.9"),
            ("content-type", "application/json"),
            ("origin", "https://dash.deno.com"),
            ("referer", "https://dash.deno.com/subhosting/new"),
            (
                "sec-ch-ua",
                "\"Chromium\";v=\"125\", \"Google Chrome\";v=\"125\", \"Not.A/Brand\";v=\"24\"",
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"Windows\""),
            ("sec-fetch-dest", "empty"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-origin"),
            ("user-agent", BROWSER_USER_AGENT),
            ("x-api-client", "true"),
        ] {
            headers.insert(name.to_string(), value.to_string());
        }
        Self { headers }
    }

    /// Creates an empty header set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            headers: BTreeMap::new(),
        }
    }

    /// Sets a header, replacing any existing value. Names are lowercased.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Returns the header value, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Rewrites the `cookie` header from the given cookie map.
    ///
    /// This mutates the shared header set in place so subsequent calls that
    /// reuse it benefit from a refreshed session.
    pub fn set_cookies(&mut self, cookies: &CookieMap) {
        self.set(COOKIE_HEADER, cookie_header_value(cookies));
    }

    /// Converts to a reqwest [`HeaderMap`].
    ///
    /// Headers with names or values that are not valid HTTP header tokens are
    /// skipped with a warning rather than failing the whole request.
    #[must_use]
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(header_name), Ok(header_value)) => {
                    map.insert(header_name, header_value);
                }
                _ => {
                    warn!(header = %name, "skipping header with invalid name or value");
                }
            }
        }
        map
    }

    /// Iterates over `(name, value)` pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self::dashboard_base()
    }
}

/// Joins a cookie map into a single `cookie` header value
/// (`name=value; name=value`).
#[must_use]
pub fn cookie_header_value(cookies: &CookieMap) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
