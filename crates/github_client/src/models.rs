//! # Models
//!
//! Request and response bodies for the GitHub App and Actions secrets endpoints
//! used by this crate.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A short-lived token scoped to one App installation.
#[derive(Debug, Clone)]
pub struct InstallationToken {
    /// The bearer token. Redacted in `Debug` output.
    pub token: SecretString,
    /// When the token expires, as reported by GitHub.
    pub expires_at: Option<String>,
}

/// Body of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Deserialize)]
pub(crate) struct InstallationTokenResponse {
    pub token: Option<String>,
    pub expires_at: Option<String>,
}

/// The public key used to seal secrets for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryPublicKey {
    /// Identifier GitHub uses to pick the matching private key.
    pub key_id: String,
    /// Curve25519 public key, standard base64.
    pub key: String,
}

/// Body of `GET /repos/{owner}/{repo}/actions/secrets/public-key`.
#[derive(Debug, Deserialize)]
pub(crate) struct PublicKeyResponse {
    pub key_id: Option<String>,
    pub key: Option<String>,
}

impl PublicKeyResponse {
    /// Both fields are required and must be non-empty.
    pub(crate) fn into_public_key(self) -> Option<RepositoryPublicKey> {
        let key_id = self.key_id.filter(|k| !k.is_empty())?;
        let key = self.key.filter(|k| !k.is_empty())?;
        Some(RepositoryPublicKey { key_id, key })
    }
}

/// Body of `PUT /repos/{owner}/{repo}/actions/secrets/{secret_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Sealed secret value, standard base64.
    pub encrypted_value: String,
    /// The `key_id` of the public key used to seal the value.
    pub key_id: String,
}
