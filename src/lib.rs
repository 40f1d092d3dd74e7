//! Provisioner Core Library
//!
//! This library automates bootstrapping an authenticated Deno Deploy
//! dashboard session (GitHub OAuth through a headless browser), persists the
//! session cookies with a calendar-date freshness check, and provisions an
//! organization, access token, project, and deployment over HTTP.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Endpoint constants, credentials, header profile, timeouts
//! - [`auth`] - Cookie store, validation probe, browser login, session manager
//! - [`api`] - Request headers and the retrying authenticated API client
//! - [`provision`] - Org/token/project/deployment pipeline and entities

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod provision;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ApiMethod, DEFAULT_MAX_ATTEMPTS, RequestHeaders};
pub use auth::{
    CookieManager, CookieMap, CookieStore, DashboardProbe, GithubOauthLogin, LoginFlow,
    SessionProbe, SessionRecord, StoreError,
};
pub use config::Credentials;
pub use provision::{Deployment, Organization, PipelineState, Project, Provisioner};
