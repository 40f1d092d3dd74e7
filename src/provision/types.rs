//! Response entities for provisioning operations.
//!
//! Only the fields the pipeline threads forward (identifiers) plus
//! human-readable reporting fields are modeled; everything else in the
//! responses is ignored.

use serde::Deserialize;

/// A created dashboard organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    /// Organization identifier, threaded into token and project creation.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A created deployment project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    /// Project identifier, threaded into deployment creation.
    pub id: String,
    /// Project name; also the primary public subdomain.
    pub name: String,
}

/// A created deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    /// Deployment identifier.
    pub id: String,
    /// Public domains assigned to this deployment, when reported.
    #[serde(default)]
    pub domains: Vec<String>,
}
