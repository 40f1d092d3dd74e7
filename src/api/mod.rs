//! Authenticated HTTP API access.
//!
//! This module provides the mutable request header set shared across calls
//! and the API client with its bounded refresh-and-retry policy for
//! authentication failures.

mod client;
mod headers;

pub use client::{ApiClient, ApiError, ApiMethod, DEFAULT_MAX_ATTEMPTS};
pub(crate) use client::truncated_body;
pub use headers::{RequestHeaders, cookie_header_value};
