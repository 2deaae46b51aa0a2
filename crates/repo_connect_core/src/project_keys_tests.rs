use super::*;
use async_trait::async_trait;
use repo_connect_store::testing::{create_test_pool, dump_project_api_keys, revoke_project_keys};
use repo_connect_store::{ProjectApiKey, SqlitePool, SqliteProjectKeyStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_test::traced_test;

async fn sqlite_manager(policy: KeyPolicy) -> (ProjectKeyManager, SqlitePool) {
    let pool = create_test_pool().await;
    let store = Arc::new(SqliteProjectKeyStore::new(pool.clone()));
    (ProjectKeyManager::new(store, policy), pool)
}

/// A store whose writes are always rejected.
struct RejectingStore {
    writes: AtomicUsize,
}

#[async_trait]
impl ProjectKeyStore for RejectingStore {
    async fn find_project_key(
        &self,
        _project_id: &str,
        _name: &str,
    ) -> Result<Option<ProjectApiKey>, StoreError> {
        Ok(None)
    }

    async fn upsert_project_key(&self, _key: &NewProjectApiKey) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::InvalidData("write rejected".to_string()))
    }
}

#[tokio::test]
async fn test_ensure_returns_tagged_key_and_stores_only_hash() {
    let (manager, pool) = sqlite_manager(KeyPolicy::RotateOnEnsure).await;

    let issued = manager.ensure_project_api_key("p1").await.unwrap();
    let plaintext = issued.plaintext.expose_secret().to_string();

    assert!(plaintext.starts_with("prc_"));
    // 32 bytes of base64url without padding is 43 characters.
    assert_eq!(plaintext.len(), 4 + 43);
    assert_eq!(issued.prefix, plaintext[..12]);

    let dump = dump_project_api_keys(&pool).await;
    assert!(!dump.contains(&plaintext));
    assert!(dump.contains(&issued.prefix));

    let row = SqliteProjectKeyStore::new(pool)
        .find_project_key("p1", GITHUB_ACTIONS_KEY_NAME)
        .await
        .unwrap()
        .unwrap();
    assert!(bcrypt::verify(&plaintext, &row.key_hash).unwrap());
    assert!(row.key_hash.starts_with("$2b$10$"));
    assert_eq!(row.scopes, GITHUB_ACTIONS_SCOPES.to_vec());
    assert!(row.is_active());
}

#[tokio::test]
async fn test_rotate_on_ensure_replaces_key() {
    let (manager, pool) = sqlite_manager(KeyPolicy::RotateOnEnsure).await;

    let first = manager.ensure_project_api_key("p1").await.unwrap();
    let second = manager.ensure_project_api_key("p1").await.unwrap();

    assert_ne!(
        first.plaintext.expose_secret(),
        second.plaintext.expose_secret()
    );
    let row = SqliteProjectKeyStore::new(pool)
        .find_project_key("p1", GITHUB_ACTIONS_KEY_NAME)
        .await
        .unwrap()
        .unwrap();
    assert!(!bcrypt::verify(first.plaintext.expose_secret(), &row.key_hash).unwrap());
    assert!(bcrypt::verify(second.plaintext.expose_secret(), &row.key_hash).unwrap());
}

#[tokio::test]
async fn test_preserve_existing_mints_when_absent() {
    let (manager, _pool) = sqlite_manager(KeyPolicy::PreserveExisting).await;

    let issued = manager.ensure_project_api_key("p1").await;

    assert!(issued.is_ok());
}

#[tokio::test]
async fn test_preserve_existing_refuses_to_overwrite_active_key() {
    let (manager, pool) = sqlite_manager(KeyPolicy::PreserveExisting).await;
    let first = manager.ensure_project_api_key("p1").await.unwrap();

    let result = manager.ensure_project_api_key("p1").await;

    assert!(matches!(result, Err(SetupError::KeyUnavailable(_))));
    let row = SqliteProjectKeyStore::new(pool)
        .find_project_key("p1", GITHUB_ACTIONS_KEY_NAME)
        .await
        .unwrap()
        .unwrap();
    assert!(bcrypt::verify(first.plaintext.expose_secret(), &row.key_hash).unwrap());
}

#[tokio::test]
async fn test_preserve_existing_replaces_revoked_key() {
    let (manager, pool) = sqlite_manager(KeyPolicy::PreserveExisting).await;
    manager.ensure_project_api_key("p1").await.unwrap();
    revoke_project_keys(&pool, "leaked").await;

    let result = manager.ensure_project_api_key("p1").await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_rejected_write_is_storage_error() {
    let store = Arc::new(RejectingStore {
        writes: AtomicUsize::new(0),
    });
    let manager = ProjectKeyManager::new(store.clone(), KeyPolicy::RotateOnEnsure);

    let result = manager.ensure_project_api_key("p1").await;

    assert!(matches!(result, Err(SetupError::Storage(_))));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

/// The store logs its own rejections; the manager only propagates them.
#[tokio::test]
#[traced_test]
async fn test_rejected_write_is_not_logged_again() {
    let store = Arc::new(RejectingStore {
        writes: AtomicUsize::new(0),
    });
    let manager = ProjectKeyManager::new(store, KeyPolicy::RotateOnEnsure);

    let result = manager.ensure_project_api_key("p1").await;

    assert!(result.is_err());
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|line| line.contains(" ERROR ")).count() {
            0 => Ok(()),
            n => Err(format!("expected no error logs, found {n}")),
        }
    });
}

#[tokio::test]
#[traced_test]
async fn test_plaintext_key_is_never_logged() {
    let (manager, _pool) = sqlite_manager(KeyPolicy::RotateOnEnsure).await;

    let issued = manager.ensure_project_api_key("p1").await.unwrap();

    assert!(logs_contain("Issued project API key"));
    assert!(!logs_contain(issued.plaintext.expose_secret()));
}

#[test]
fn test_key_policy_from_flag() {
    assert_eq!(KeyPolicy::from_rotate_flag(true), KeyPolicy::RotateOnEnsure);
    assert_eq!(KeyPolicy::from_rotate_flag(false), KeyPolicy::PreserveExisting);
    assert_eq!(KeyPolicy::default(), KeyPolicy::RotateOnEnsure);
}

#[test]
fn test_generated_keys_differ() {
    let a = generate_key();
    let b = generate_key();

    assert_ne!(a.expose_secret(), b.expose_secret());
}
