//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Automated dashboard session bootstrap and deployment provisioning.
///
/// Obtains an authenticated dashboard session (reusing persisted cookies
/// when still valid, logging in through a headless browser otherwise), then
/// provisions an organization, access token, project, and deployment.
#[derive(Parser, Debug)]
#[command(name = "dash-provision")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path of the persisted session-cookie record
    #[arg(long, default_value = "deno_cookies.json")]
    pub cookie_file: PathBuf,

    /// Directory for diagnostic screenshots captured on login failures
    #[arg(long, default_value = ".")]
    pub screenshot_dir: PathBuf,
}
