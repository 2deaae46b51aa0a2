//! RepoConnect API Server
//!
//! Main binary for running the API server.
//!
//! # Environment Variables
//!
//! - `API_PORT`: Port to listen on (default: 8080)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RUST_LOG`: Log level (default: info)
//! - `DATABASE_URL`: SQLite database (default: `sqlite://repo_connect.db?mode=rwc`)
//! - `PERCEO_GITHUB_APP_*`, `PERCEO_SETUP_*`: see `repo_connect_core::config`

use std::{env, sync::Arc};

use anyhow::Context;
use repo_connect_api::{ApiConfig, ApiServer, AppState};
use repo_connect_core::{SetupConfig, SetupService};
use repo_connect_store::{SqliteInstallationStore, SqliteProjectKeyStore};

const DEFAULT_DATABASE_URL: &str = "sqlite://repo_connect.db?mode=rwc";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let api_config = ApiConfig::from_lookup(|name| env::var(name).ok())?;
    let setup_config = SetupConfig::from_env().context("Invalid GitHub App configuration")?;

    // Missing credentials fail the request that needs them, not start-up.
    if setup_config.app_id.is_none() || setup_config.private_key.is_none() {
        tracing::warn!("GitHub App credentials are not configured; provisioning requests will fail");
    }
    if setup_config.install_url.is_none() {
        tracing::warn!("No install URL configured; callers receive the raw state token");
    }

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let pool = repo_connect_store::connect(&database_url)
        .await
        .context("Failed to open database")?;

    let service = SetupService::new(
        &setup_config,
        Arc::new(setup_config.github_client()),
        Arc::new(SqliteInstallationStore::new(pool.clone())),
        Arc::new(SqliteProjectKeyStore::new(pool)),
    );
    if !service.state_codec().is_signed() {
        tracing::warn!("No state secret configured; install state tokens are not signed");
    }
    let server = ApiServer::new(api_config, AppState::new(service));

    tracing::info!("Starting RepoConnect API server");
    tracing::info!(github_api = %setup_config.api_base_url, "GitHub API");

    server.serve().await
}
