//! Relational storage for the repository connection flow.
//!
//! Two tables back the flow:
//!
//! - `github_installations`: which accounts (organizations or users) have
//!   authorized the GitHub App, and under which installation ID.
//! - `project_api_keys`: the hashed API key each project uses from GitHub
//!   Actions. Plaintext keys are never written.
//!
//! Business logic depends on the [`InstallationStore`] and [`ProjectKeyStore`]
//! traits; the SQLite implementations live in this crate.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub mod error;
pub mod installations;
pub mod project_keys;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::StoreError;
pub use installations::{InstallationRecord, InstallationStore, SqliteInstallationStore};
pub use project_keys::{NewProjectApiKey, ProjectApiKey, ProjectKeyStore, SqliteProjectKeyStore};
pub use sqlx::sqlite::SqlitePool;

/// Default number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Opens a connection pool and makes sure the tables exist.
///
/// # Errors
///
/// Returns `StoreError::Sqlx` if the URL is invalid, the database cannot be
/// opened, or the schema cannot be created.
#[tracing::instrument]
pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    schema::create_tables(&pool).await?;

    info!("Connected to database");
    Ok(pool)
}
