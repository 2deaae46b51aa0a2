//! Project API keys for GitHub Actions.
//!
//! Every project has one key named `github-actions`. Its plaintext leaves this
//! module exactly once, in the [`IssuedKey`] returned when it is minted; the
//! store only ever sees the bcrypt hash and a 12 character display prefix.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use repo_connect_store::{NewProjectApiKey, ProjectKeyStore};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::SetupError;

#[cfg(test)]
#[path = "project_keys_tests.rs"]
mod tests;

/// Name of the key row used by GitHub Actions.
pub const GITHUB_ACTIONS_KEY_NAME: &str = "github-actions";

/// Scopes granted to the GitHub Actions key.
pub const GITHUB_ACTIONS_SCOPES: [&str; 5] = [
    "ci:analyze",
    "ci:test",
    "flows:read",
    "insights:read",
    "events:publish",
];

/// Every key starts with this tag.
pub const KEY_TAG: &str = "prc_";

/// Number of leading plaintext characters kept for display.
pub const KEY_PREFIX_LENGTH: usize = 12;

/// bcrypt work factor.
pub const KEY_HASH_COST: u32 = 10;

const KEY_BYTES: usize = 32;

/// What `ensure` does when the project already has a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Mint a new key and overwrite the stored hash. Keys handed out earlier stop working.
    #[default]
    RotateOnEnsure,
    /// Keep an active key. Since its plaintext cannot be recovered, ensure
    /// reports `KeyUnavailable` instead of returning it.
    PreserveExisting,
}

impl KeyPolicy {
    pub fn from_rotate_flag(rotate_on_ensure: bool) -> Self {
        if rotate_on_ensure {
            KeyPolicy::RotateOnEnsure
        } else {
            KeyPolicy::PreserveExisting
        }
    }
}

/// A freshly minted key.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    /// The only copy of the plaintext.
    pub plaintext: SecretString,
    pub prefix: String,
}

/// Issues project API keys.
#[derive(Clone)]
pub struct ProjectKeyManager {
    store: Arc<dyn ProjectKeyStore>,
    policy: KeyPolicy,
}

impl ProjectKeyManager {
    pub fn new(store: Arc<dyn ProjectKeyStore>, policy: KeyPolicy) -> Self {
        Self { store, policy }
    }

    /// Makes sure the project has a GitHub Actions key and returns its plaintext.
    ///
    /// # Errors
    ///
    /// - `SetupError::Storage` if the store cannot be read or rejects the write.
    /// - `SetupError::KeyUnavailable` if the policy keeps an existing key, or hashing fails.
    #[instrument(skip(self))]
    pub async fn ensure_project_api_key(&self, project_id: &str) -> Result<IssuedKey, SetupError> {
        if self.policy == KeyPolicy::PreserveExisting {
            let existing = self
                .store
                .find_project_key(project_id, GITHUB_ACTIONS_KEY_NAME)
                .await?;
            if let Some(existing) = existing.filter(|k| k.is_active()) {
                warn!(
                    key_prefix = %existing.key_prefix,
                    "Project already has an active key and the policy keeps it"
                );
                return Err(SetupError::KeyUnavailable(format!(
                    "project already has an active key ({}...) whose value cannot be recovered",
                    existing.key_prefix
                )));
            }
        }

        let plaintext = generate_key();
        let prefix = key_prefix(plaintext.expose_secret());
        let key_hash = hash_key(plaintext.clone()).await?;

        let row = NewProjectApiKey {
            project_id: project_id.to_string(),
            name: GITHUB_ACTIONS_KEY_NAME.to_string(),
            key_hash,
            key_prefix: prefix.clone(),
            scopes: GITHUB_ACTIONS_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        self.store.upsert_project_key(&row).await?;

        info!(key_prefix = %prefix, "Issued project API key");
        Ok(IssuedKey { plaintext, prefix })
    }
}

/// `prc_` followed by 32 random bytes, base64url.
fn generate_key() -> SecretString {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SecretString::from(format!("{KEY_TAG}{}", URL_SAFE_NO_PAD.encode(bytes)))
}

fn key_prefix(plaintext: &str) -> String {
    plaintext.chars().take(KEY_PREFIX_LENGTH).collect()
}

async fn hash_key(plaintext: SecretString) -> Result<String, SetupError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext.expose_secret(), KEY_HASH_COST))
        .await
        .map_err(|e| SetupError::KeyUnavailable(format!("key hashing task failed: {e}")))?
        .map_err(|e| SetupError::KeyUnavailable(format!("failed to hash key: {e}")))
}
