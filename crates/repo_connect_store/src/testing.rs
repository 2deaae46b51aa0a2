//! Helpers for tests that need a real database.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::schema::create_tables;

/// An in-memory database with all tables created.
///
/// Limited to one connection: every SQLite `:memory:` connection is its own database.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str(":memory:")
        .unwrap()
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create test pool");

    create_tables(&pool).await.unwrap();
    pool
}

/// Every stored value of every project key row, joined into one string.
pub async fn dump_project_api_keys(pool: &SqlitePool) -> String {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT id || '|' || project_id || '|' || name || '|' || key_hash || '|' ||
               key_prefix || '|' || scopes || '|' || created_at || '|' || updated_at || '|' ||
               COALESCE(revoked_at, '') || '|' || COALESCE(revocation_reason, '')
        FROM project_api_keys
        "#,
    )
    .fetch_all(pool)
    .await
    .unwrap();

    rows.into_iter()
        .map(|(row,)| row)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Marks every project key as revoked.
pub async fn revoke_project_keys(pool: &SqlitePool, reason: &str) {
    sqlx::query("UPDATE project_api_keys SET revoked_at = ?, revocation_reason = ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(reason)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count_installations(pool: &SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM github_installations")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}
