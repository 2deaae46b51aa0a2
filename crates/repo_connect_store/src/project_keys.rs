//! Project API key storage.
//!
//! Only the hash and a short display prefix of each key are stored.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

use crate::StoreError;

#[cfg(test)]
#[path = "project_keys_tests.rs"]
mod tests;

/// A stored project API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectApiKey {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub revoked_at: Option<String>,
    pub revocation_reason: Option<String>,
}

impl ProjectApiKey {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// The values written when a key is issued.
#[derive(Debug, Clone)]
pub struct NewProjectApiKey {
    pub project_id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
}

/// Read and write access to project API keys.
#[async_trait]
pub trait ProjectKeyStore: Send + Sync {
    async fn find_project_key(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<ProjectApiKey>, StoreError>;

    /// Inserts the key, or overwrites the hash, prefix and scopes of the
    /// existing `(project_id, name)` row and clears its revocation.
    async fn upsert_project_key(&self, key: &NewProjectApiKey) -> Result<(), StoreError>;
}

/// SQLite-backed project key store.
#[derive(Clone)]
pub struct SqliteProjectKeyStore {
    pool: SqlitePool,
}

impl SqliteProjectKeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectKeyStore for SqliteProjectKeyStore {
    #[tracing::instrument(skip(self))]
    async fn find_project_key(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<ProjectApiKey>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, name, key_hash, key_prefix, scopes,
                   created_at, updated_at, revoked_at, revocation_reason
            FROM project_api_keys
            WHERE project_id = ? AND name = ?
            "#,
        )
        .bind(project_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let scopes: String = row.try_get("scopes")?;
        Ok(Some(ProjectApiKey {
            id: row.try_get("id")?,
            project_id: row.try_get("project_id")?,
            name: row.try_get("name")?,
            key_hash: row.try_get("key_hash")?,
            key_prefix: row.try_get("key_prefix")?,
            scopes: serde_json::from_str(&scopes)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            revoked_at: row.try_get("revoked_at")?,
            revocation_reason: row.try_get("revocation_reason")?,
        }))
    }

    #[tracing::instrument(skip(self, key), fields(project_id = %key.project_id, name = %key.name))]
    async fn upsert_project_key(&self, key: &NewProjectApiKey) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let scopes = serde_json::to_string(&key.scopes)?;

        // A single statement so concurrent writers resolve to last-writer-wins.
        let result = sqlx::query(
            r#"
            INSERT INTO project_api_keys (
                id, project_id, name, key_hash, key_prefix, scopes,
                created_at, updated_at, revoked_at, revocation_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, NULL, NULL)
            ON CONFLICT(project_id, name) DO UPDATE SET
                key_hash = excluded.key_hash,
                key_prefix = excluded.key_prefix,
                scopes = excluded.scopes,
                updated_at = excluded.updated_at,
                revoked_at = NULL,
                revocation_reason = NULL
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&key.project_id)
        .bind(&key.name)
        .bind(&key.key_hash)
        .bind(&key.key_prefix)
        .bind(&scopes)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let e = StoreError::from(e);
            tracing::error!(
                code = ?e.code(),
                detail = %e.detail(),
                "project_api_key: upsert rejected"
            );
            return Err(e);
        }

        tracing::info!(key_prefix = %key.key_prefix, "project_api_key: upserted");
        Ok(())
    }
}
