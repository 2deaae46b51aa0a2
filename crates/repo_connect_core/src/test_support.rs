//! In-memory fakes for the GitHub and storage seams, with call counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crypto_box::aead::OsRng;
use crypto_box::SecretKey;
use github_client::{
    AccountType, EncryptedSecret, GitHubAppApi, InstallationAccount, InstallationToken,
    RepositoryPublicKey,
};
use repo_connect_store::{
    InstallationRecord, InstallationStore, NewProjectApiKey, ProjectApiKey, ProjectKeyStore,
    StoreError,
};
use secrecy::SecretString;

pub(crate) const PUBLIC_KEY_ID: &str = "568250167242549743";

/// What a fake GitHub call should do instead of succeeding.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Status(u16),
    MissingCredentials,
}

impl Failure {
    fn into_error(self) -> github_client::Error {
        match self {
            Failure::Status(status) => github_client::Error::UnexpectedStatus {
                status,
                body: format!(r#"{{"message":"fake failure {status}"}}"#),
            },
            Failure::MissingCredentials => {
                github_client::Error::Configuration("PERCEO_GITHUB_APP_ID is not set".to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Upload {
    pub installation_token: String,
    pub owner: String,
    pub repo: String,
    pub secret_name: String,
    pub secret: EncryptedSecret,
}

pub(crate) struct FakeGitHub {
    pub repository_key: SecretKey,
    pub public_key_id: String,
    /// Served instead of the real public key when set.
    pub public_key_override: Option<String>,
    pub account: Option<InstallationAccount>,
    pub token_failure: Option<Failure>,
    pub public_key_failure: Option<Failure>,
    pub upload_failure: Option<Failure>,
    pub account_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub public_key_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub token_installation_ids: Mutex<Vec<u64>>,
    pub uploads: Mutex<Vec<Upload>>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self {
            repository_key: SecretKey::generate(&mut OsRng),
            public_key_id: PUBLIC_KEY_ID.to_string(),
            public_key_override: None,
            account: None,
            token_failure: None,
            public_key_failure: None,
            upload_failure: None,
            account_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            public_key_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            token_installation_ids: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(mut self, login: &str, account_type: AccountType) -> Self {
        self.account = Some(InstallationAccount {
            login: login.to_string(),
            account_type,
        });
        self
    }

    pub fn failing_token(mut self, failure: Failure) -> Self {
        self.token_failure = Some(failure);
        self
    }

    pub fn failing_public_key(mut self, failure: Failure) -> Self {
        self.public_key_failure = Some(failure);
        self
    }

    pub fn failing_upload(mut self, failure: Failure) -> Self {
        self.upload_failure = Some(failure);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
            + self.token_calls.load(Ordering::SeqCst)
            + self.public_key_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    /// Opens a sealed upload with the repository's private key.
    pub fn unseal(&self, encrypted_value: &str) -> String {
        let sealed = STANDARD.decode(encrypted_value).unwrap();
        let plain = self.repository_key.unseal(&sealed).unwrap();
        String::from_utf8(plain).unwrap()
    }
}

#[async_trait]
impl GitHubAppApi for FakeGitHub {
    async fn get_installation_account(&self, _installation_id: u64) -> Option<InstallationAccount> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        self.account.clone()
    }

    async fn create_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken, github_client::Error> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.token_installation_ids
            .lock()
            .unwrap()
            .push(installation_id);
        if let Some(failure) = self.token_failure {
            return Err(failure.into_error());
        }
        Ok(InstallationToken {
            token: SecretString::from(format!("ghs_token_for_{installation_id}")),
            expires_at: None,
        })
    }

    async fn get_repository_public_key(
        &self,
        _token: &InstallationToken,
        _owner: &str,
        _repo: &str,
    ) -> Result<RepositoryPublicKey, github_client::Error> {
        self.public_key_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.public_key_failure {
            return Err(failure.into_error());
        }
        Ok(RepositoryPublicKey {
            key_id: self.public_key_id.clone(),
            key: self
                .public_key_override
                .clone()
                .unwrap_or_else(|| STANDARD.encode(self.repository_key.public_key().as_bytes())),
        })
    }

    async fn put_repository_secret(
        &self,
        token: &InstallationToken,
        owner: &str,
        repo: &str,
        secret_name: &str,
        secret: &EncryptedSecret,
    ) -> Result<(), github_client::Error> {
        use secrecy::ExposeSecret;

        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.upload_failure {
            return Err(failure.into_error());
        }
        self.uploads.lock().unwrap().push(Upload {
            installation_token: token.token.expose_secret().to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            secret_name: secret_name.to_string(),
            secret: secret.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryInstallationStore {
    pub rows: Mutex<HashMap<u64, (String, AccountType)>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub upserts: AtomicUsize,
}

impl MemoryInstallationStore {
    pub fn with_installation(self, installation_id: u64, login: &str) -> Self {
        self.rows.lock().unwrap().insert(
            installation_id,
            (login.to_lowercase(), AccountType::Organization),
        );
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn store_failure() -> StoreError {
    StoreError::InvalidData("database is unavailable".to_string())
}

#[async_trait]
impl InstallationStore for MemoryInstallationStore {
    async fn find_installation_by_login(
        &self,
        login: &str,
    ) -> Result<Option<InstallationRecord>, StoreError> {
        if self.fail_reads {
            return Err(store_failure());
        }
        let login = login.to_lowercase();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(_, (l, _))| *l == login)
            .map(|(id, (l, t))| InstallationRecord {
                installation_id: *id,
                account_login: l.clone(),
                account_type: *t,
                updated_at: "2026-10-16T00:00:00.000000Z".to_string(),
            }))
    }

    async fn upsert_installation(
        &self,
        installation_id: u64,
        account_login: &str,
        account_type: AccountType,
    ) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(store_failure());
        }
        self.rows
            .lock()
            .unwrap()
            .insert(installation_id, (account_login.to_lowercase(), account_type));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryProjectKeyStore {
    pub rows: Mutex<HashMap<(String, String), ProjectApiKey>>,
    pub fail_writes: bool,
    pub writes: AtomicUsize,
}

#[async_trait]
impl ProjectKeyStore for MemoryProjectKeyStore {
    async fn find_project_key(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<ProjectApiKey>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(project_id.to_string(), name.to_string()))
            .cloned())
    }

    async fn upsert_project_key(&self, key: &NewProjectApiKey) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(store_failure());
        }
        self.rows.lock().unwrap().insert(
            (key.project_id.clone(), key.name.clone()),
            ProjectApiKey {
                id: format!("key-{}", key.project_id),
                project_id: key.project_id.clone(),
                name: key.name.clone(),
                key_hash: key.key_hash.clone(),
                key_prefix: key.key_prefix.clone(),
                scopes: key.scopes.clone(),
                created_at: "2026-10-16T00:00:00.000000Z".to_string(),
                updated_at: "2026-10-16T00:00:00.000000Z".to_string(),
                revoked_at: None,
                revocation_reason: None,
            },
        );
        Ok(())
    }
}
