//! Table definitions.
//!
//! Statements are idempotent and run at start-up. Versioned migrations are
//! managed outside this service.

use sqlx::sqlite::SqlitePool;

use crate::StoreError;

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

const CREATE_GITHUB_INSTALLATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS github_installations (
        installation_id INTEGER PRIMARY KEY,
        account_login TEXT NOT NULL,
        account_type TEXT NOT NULL CHECK (account_type IN ('Organization', 'User')),
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_GITHUB_INSTALLATIONS_LOGIN_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_github_installations_account_login
        ON github_installations (account_login)
"#;

const CREATE_PROJECT_API_KEYS: &str = r#"
    CREATE TABLE IF NOT EXISTS project_api_keys (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL,
        name TEXT NOT NULL,
        key_hash TEXT NOT NULL,
        key_prefix TEXT NOT NULL,
        scopes TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        revoked_at TEXT,
        revocation_reason TEXT,
        UNIQUE (project_id, name)
    )
"#;

/// Creates all tables and indexes that do not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn create_tables(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in [
        CREATE_GITHUB_INSTALLATIONS,
        CREATE_GITHUB_INSTALLATIONS_LOGIN_INDEX,
        CREATE_PROJECT_API_KEYS,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
