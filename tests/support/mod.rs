//! Shared test doubles for integration tests: a probe that always rejects
//! the session and a login flow that hands out a fixed cookie set, so a real
//! `CookieManager` can be wired without a browser.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use provisioner_core::{
    CookieManager, CookieMap, CookieStore, LoginFlow, RequestHeaders, SessionProbe,
};
use tempfile::TempDir;

/// Probe stub that treats every session as invalid, forcing the login path.
pub struct DenyProbe;

#[async_trait]
impl SessionProbe for DenyProbe {
    async fn is_session_valid(&self, _cookies: &CookieMap, _base_headers: &RequestHeaders) -> bool {
        false
    }
}

/// Login stub that returns a fixed cookie set and counts invocations.
pub struct FixedLogin {
    cookies: CookieMap,
    pub calls: AtomicUsize,
}

impl FixedLogin {
    pub fn new(cookies: CookieMap) -> Self {
        Self {
            cookies,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LoginFlow for FixedLogin {
    async fn acquire_session(&self) -> Option<CookieMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.cookies.clone())
    }
}

/// Cookie map holding a single required session cookie.
pub fn cookies(token: &str) -> CookieMap {
    CookieMap::from([("token".to_string(), token.to_string())])
}

/// Builds a manager whose every refresh yields `fresh` via the stub login.
/// The store lives under `dir` so nothing leaks between tests.
pub fn manager_yielding(dir: &TempDir, fresh: CookieMap) -> Arc<CookieManager> {
    let store = CookieStore::new(dir.path().join("cookies.json"));
    Arc::new(CookieManager::new(
        store,
        Arc::new(DenyProbe),
        Arc::new(FixedLogin::new(fresh)),
    ))
}
