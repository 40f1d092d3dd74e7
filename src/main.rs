//! CLI entry point for the provisioning tool.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use provisioner_core::provision::public_urls;
use provisioner_core::{
    ApiClient, CookieManager, CookieStore, Credentials, DashboardProbe, GithubOauthLogin,
    Provisioner, RequestHeaders, config,
};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Provisioner starting");

    let credentials = Credentials::from_env();
    if credentials.is_placeholder() {
        // Persisted cookies may still carry the run; only a browser login is off the table.
        info!(
            "credentials are placeholder values; set {} and {} to enable browser login",
            config::GITHUB_USER_ENV,
            config::GITHUB_PASS_ENV
        );
    }

    let store = CookieStore::new(&args.cookie_file);
    let probe = Arc::new(DashboardProbe::new(config::DASHBOARD_URL));
    let login = Arc::new(GithubOauthLogin::new(credentials, &args.screenshot_dir));
    let manager = Arc::new(CookieManager::new(store, probe, login));

    info!("initializing cookie management");
    let mut headers = RequestHeaders::dashboard_base();
    let Some(cookies) = manager.get_active_cookies(&headers).await else {
        error!("could not obtain valid authentication cookies");
        anyhow::bail!("no usable session cookies could be obtained");
    };
    headers.set_cookies(&cookies);
    info!("session headers prepared");

    let api = ApiClient::new(Arc::clone(&manager));
    let provisioner = Provisioner::new(api, config::DASHBOARD_API_BASE, config::DEPLOY_API_BASE);

    let state = provisioner.run(&mut headers).await;

    info!(
        organization = state.organization.is_some(),
        token = state.token.is_some(),
        project = state.project.is_some(),
        deployment = state.deployment.is_some(),
        "provisioning finished"
    );

    if let (Some(project), Some(deployment)) = (&state.project, &state.deployment) {
        println!("Deployment URLs:");
        for url in public_urls(project, deployment) {
            println!("  {url}");
        }
    }

    Ok(())
}
