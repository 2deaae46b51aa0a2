//! Installation directory storage.
//!
//! Maps an account login to the GitHub App installation that covers it.
//! Logins are stored lowercased so lookups ignore case.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use github_client::AccountType;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::StoreError;

#[cfg(test)]
#[path = "installations_tests.rs"]
mod tests;

/// One row of the installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    pub installation_id: u64,
    /// Lowercased account login.
    pub account_login: String,
    pub account_type: AccountType,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

/// Read and write access to the installation directory.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    /// Finds the installation for an account login, ignoring case.
    ///
    /// When several installations share a login the most recently updated one wins.
    async fn find_installation_by_login(
        &self,
        login: &str,
    ) -> Result<Option<InstallationRecord>, StoreError>;

    /// Records an installation, replacing the login and type of an existing
    /// row with the same installation ID.
    async fn upsert_installation(
        &self,
        installation_id: u64,
        account_login: &str,
        account_type: AccountType,
    ) -> Result<(), StoreError>;
}

/// SQLite-backed installation directory.
#[derive(Clone)]
pub struct SqliteInstallationStore {
    pool: SqlitePool,
}

impl SqliteInstallationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_db_id(installation_id: u64) -> Result<i64, StoreError> {
    i64::try_from(installation_id).map_err(|_| {
        StoreError::InvalidData(format!(
            "installation ID {installation_id} does not fit in a database integer"
        ))
    })
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<InstallationRecord, StoreError> {
    let installation_id: i64 = row.try_get("installation_id")?;
    let account_type: String = row.try_get("account_type")?;
    Ok(InstallationRecord {
        installation_id: u64::try_from(installation_id).map_err(|_| {
            StoreError::InvalidData(format!("negative installation ID {installation_id}"))
        })?,
        account_login: row.try_get("account_login")?,
        account_type: account_type.parse().map_err(StoreError::InvalidData)?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl InstallationStore for SqliteInstallationStore {
    #[tracing::instrument(skip(self))]
    async fn find_installation_by_login(
        &self,
        login: &str,
    ) -> Result<Option<InstallationRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT installation_id, account_login, account_type, updated_at
            FROM github_installations
            WHERE account_login = ?
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(login.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn upsert_installation(
        &self,
        installation_id: u64,
        account_login: &str,
        account_type: AccountType,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO github_installations (
                installation_id, account_login, account_type, updated_at
            ) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(installation_id) DO UPDATE SET
                account_login = excluded.account_login,
                account_type = excluded.account_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(to_db_id(installation_id)?)
        .bind(account_login.to_lowercase())
        .bind(account_type.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            installation_id,
            account_login = %account_login,
            account_type = %account_type,
            "github_installation: upserted"
        );

        Ok(())
    }
}
