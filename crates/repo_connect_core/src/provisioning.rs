//! Deposits a project API key into a repository's Actions secrets.
//!
//! Provisioning is a strict sequence: installation token, repository public
//! key, seal, upload. The first failing step ends the run; nothing is retried
//! and nothing is rolled back.

use std::sync::Arc;

use github_client::{seal_secret, EncryptedSecret, GitHubAppApi};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::errors::ProvisioningStage;
use crate::target::RepositoryTarget;
use crate::SetupError;

#[cfg(test)]
#[path = "provisioning_tests.rs"]
mod tests;

/// Name of the Actions secret holding the project API key.
pub const SECRET_NAME: &str = "PERCEO_API_KEY";

#[derive(Clone)]
pub struct SecretProvisioner {
    github: Arc<dyn GitHubAppApi>,
}

impl SecretProvisioner {
    pub fn new(github: Arc<dyn GitHubAppApi>) -> Self {
        Self { github }
    }

    /// Seals `secret_value` with the repository's public key and stores it as
    /// the [`SECRET_NAME`] Actions secret.
    ///
    /// # Errors
    ///
    /// - `SetupError::Configuration` if the App cannot authenticate.
    /// - `SetupError::Upstream` tagged with the failing stage otherwise.
    #[instrument(
        skip(self, target, secret_value),
        fields(owner = %target.owner(), repo = %target.repo())
    )]
    pub async fn provision(
        &self,
        installation_id: u64,
        target: &RepositoryTarget,
        secret_value: &SecretString,
    ) -> Result<(), SetupError> {
        let token = self
            .github
            .create_installation_token(installation_id)
            .await
            .map_err(|e| stage_failed(ProvisioningStage::Token, e))?;

        let public_key = self
            .github
            .get_repository_public_key(&token, target.owner(), target.repo())
            .await
            .map_err(|e| stage_failed(ProvisioningStage::PublicKey, e))?;

        // A key GitHub handed us that cannot seal is a bad public-key response.
        let encrypted_value = seal_secret(&public_key.key, secret_value.expose_secret())
            .map_err(|e| stage_failed(ProvisioningStage::PublicKey, e))?;

        let secret = EncryptedSecret {
            encrypted_value,
            key_id: public_key.key_id,
        };
        self.github
            .put_repository_secret(
                &token,
                target.owner(),
                target.repo(),
                SECRET_NAME,
                &secret,
            )
            .await
            .map_err(|e| stage_failed(ProvisioningStage::CreateSecret, e))?;

        info!(
            installation_id,
            key_id = %secret.key_id,
            "Provisioned {} for {}",
            SECRET_NAME,
            target.full_name()
        );
        Ok(())
    }
}

fn stage_failed(stage: ProvisioningStage, error: github_client::Error) -> SetupError {
    let error = SetupError::from_github(stage, error);
    match &error {
        SetupError::Upstream { status, body, .. } => warn!(
            stage = %stage,
            status = ?status,
            body = %body,
            "Secret provisioning failed"
        ),
        other => warn!(stage = %stage, error = %other, "Secret provisioning failed"),
    }
    error
}
