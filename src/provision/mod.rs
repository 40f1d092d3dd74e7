//! Resource provisioning pipeline.
//!
//! Sequential org -> token -> project -> deployment wiring on top of the
//! authenticated API client, with explicit pipeline state instead of
//! hidden globals.

mod pipeline;
mod types;

pub use pipeline::{PipelineState, ProvisionError, Provisioner, public_urls};
pub use types::{Deployment, Organization, Project};
