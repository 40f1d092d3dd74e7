//! Authentication and session-cookie management.
//!
//! This module owns the full session lifecycle: a persisted cookie record
//! with a capture date, a lightweight validation probe, the browser-driven
//! GitHub OAuth login flow, and the manager that orchestrates the three into
//! a single "get active cookies" operation.

mod login;
mod manager;
mod store;
mod validator;

use std::collections::BTreeMap;

/// Session cookies as a name-to-value map.
///
/// `BTreeMap` keeps iteration (and therefore the joined `cookie` header)
/// deterministic.
pub type CookieMap = BTreeMap<String, String>;

pub use login::{GithubOauthLogin, LoginError, LoginFlow};
pub use manager::CookieManager;
pub use store::{CookieStore, SessionRecord, StoreError};
pub use validator::{DashboardProbe, SessionProbe};
