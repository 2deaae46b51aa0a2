//! Connects a repository to a project.
//!
//! There are two ways in:
//!
//! - [`SetupService::configure_repository`] is called directly by the CLI or
//!   web UI. When the repository's owner has already installed the GitHub App
//!   the secret is provisioned straight away; otherwise the caller gets an
//!   install URL carrying a state token.
//! - [`SetupService::complete_installation`] handles GitHub's redirect after
//!   the install screen. It records the installation and then provisions the
//!   repository named in the state token.
//!
//! An owner therefore goes through GitHub's install screen once. Every later
//! repository under the same owner takes the direct path.

use std::sync::Arc;

use github_client::GitHubAppApi;
use repo_connect_store::{InstallationStore, ProjectKeyStore};
use tracing::{error, info, instrument, warn};

use crate::config::SetupConfig;
use crate::project_keys::ProjectKeyManager;
use crate::provisioning::SecretProvisioner;
use crate::state::{SetupState, StateCodec};
use crate::target::RepositoryTarget;
use crate::SetupError;

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// Result of a direct configure request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The secret was written to `repo` (`owner/repo`).
    Configured { repo: String },
    /// The owner has not installed the App yet.
    ///
    /// Carries the install URL when one is configured, otherwise the raw state
    /// token so the caller can build the URL itself.
    NeedsInstall {
        install_url: Option<String>,
        state: Option<String>,
    },
}

/// Why an install callback could not finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFailure {
    /// Missing or unreadable state token or installation ID.
    InvalidCallback,
    /// No API key could be issued for the project.
    NoKey,
    /// Provisioning the secret failed.
    GitHubError,
}

impl CallbackFailure {
    /// The tag shown to the user on the setup page.
    pub fn as_tag(&self) -> &'static str {
        match self {
            CallbackFailure::InvalidCallback => "invalid_callback",
            CallbackFailure::NoKey => "no_key",
            CallbackFailure::GitHubError => "github_error",
        }
    }
}

impl std::fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Result of an install callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed { repo: String },
    Failed(CallbackFailure),
}

pub struct SetupService {
    github: Arc<dyn GitHubAppApi>,
    installations: Arc<dyn InstallationStore>,
    keys: ProjectKeyManager,
    provisioner: SecretProvisioner,
    state_codec: StateCodec,
    install_url: Option<String>,
}

impl SetupService {
    pub fn new(
        config: &SetupConfig,
        github: Arc<dyn GitHubAppApi>,
        installations: Arc<dyn InstallationStore>,
        project_keys: Arc<dyn ProjectKeyStore>,
    ) -> Self {
        Self {
            provisioner: SecretProvisioner::new(github.clone()),
            github,
            installations,
            keys: ProjectKeyManager::new(project_keys, config.key_policy),
            state_codec: StateCodec::new(config.state_secret.clone(), config.state_ttl),
            install_url: config.install_url.clone(),
        }
    }

    pub fn state_codec(&self) -> &StateCodec {
        &self.state_codec
    }

    /// Provisions `owner/repo` for the project if the owner already
    /// authorized the App, otherwise asks the caller to send the user to
    /// GitHub's install screen.
    ///
    /// # Errors
    ///
    /// - `SetupError::Validation` for an empty or malformed project, owner or repository.
    /// - `SetupError::Storage` if the installation directory cannot be read or the key cannot be stored.
    /// - `SetupError::KeyUnavailable` if no key can be issued.
    /// - `SetupError::Configuration` / `SetupError::Upstream` if provisioning fails.
    #[instrument(skip(self))]
    pub async fn configure_repository(
        &self,
        project_id: &str,
        owner: &str,
        repo: &str,
    ) -> Result<ConfigureOutcome, SetupError> {
        let target = RepositoryTarget::new(project_id, owner, repo)?;

        let installation = self
            .installations
            .find_installation_by_login(target.owner())
            .await
            .inspect_err(|e| error!(error = %e, "Failed to look up installation"))?;

        let Some(installation) = installation else {
            let state = self.state_codec.encode(&SetupState {
                project_id: target.project_id().to_string(),
                owner: target.owner().to_string(),
                repo: target.repo().to_string(),
            });
            info!(owner = %target.owner(), "Owner has not installed the App");
            return Ok(match &self.install_url {
                Some(base) => ConfigureOutcome::NeedsInstall {
                    install_url: Some(format!("{base}?state={state}")),
                    state: None,
                },
                None => ConfigureOutcome::NeedsInstall {
                    install_url: None,
                    state: Some(state),
                },
            });
        };

        let key = self
            .keys
            .ensure_project_api_key(target.project_id())
            .await
            .inspect_err(|e| error!(error = %e, "No API key for project"))?;

        self.provisioner
            .provision(installation.installation_id, &target, &key.plaintext)
            .await?;

        info!(
            installation_id = installation.installation_id,
            repo = %target.full_name(),
            "Repository configured"
        );
        Ok(ConfigureOutcome::Configured {
            repo: target.full_name(),
        })
    }

    /// Finishes setup after GitHub redirects back from the install screen.
    ///
    /// Never fails: every problem becomes a [`CallbackFailure`]. Recording the
    /// installation is best-effort and does not stop provisioning.
    #[instrument(skip(self, state))]
    pub async fn complete_installation(
        &self,
        installation_id: Option<&str>,
        state: Option<&str>,
    ) -> CallbackOutcome {
        let decoded = state.and_then(|s| self.state_codec.decode(s));
        let installation_id = installation_id.and_then(parse_installation_id);

        let (Some(decoded), Some(installation_id)) = (decoded, installation_id) else {
            warn!("Install callback without a valid state token and installation ID");
            return CallbackOutcome::Failed(CallbackFailure::InvalidCallback);
        };

        let target = match RepositoryTarget::new(decoded.project_id, decoded.owner, decoded.repo)
        {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Install callback state names an invalid repository");
                return CallbackOutcome::Failed(CallbackFailure::InvalidCallback);
            }
        };

        self.record_installation(installation_id, &target).await;

        let key = match self.keys.ensure_project_api_key(target.project_id()).await {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "No API key for project");
                return CallbackOutcome::Failed(CallbackFailure::NoKey);
            }
        };

        if let Err(e) = self
            .provisioner
            .provision(installation_id, &target, &key.plaintext)
            .await
        {
            error!(
                error = %e,
                stage = ?e.stage(),
                "Install callback could not provision the secret"
            );
            return CallbackOutcome::Failed(CallbackFailure::GitHubError);
        }

        info!(
            installation_id,
            repo = %target.full_name(),
            "Repository configured after install"
        );
        CallbackOutcome::Completed {
            repo: target.full_name(),
        }
    }

    /// Looks up who owns the installation and stores it. Failures are logged only.
    async fn record_installation(&self, installation_id: u64, target: &RepositoryTarget) {
        let Some(account) = self.github.get_installation_account(installation_id).await else {
            warn!(
                installation_id,
                "Could not resolve installation account; not recording it"
            );
            return;
        };

        if !account.login.eq_ignore_ascii_case(target.owner()) {
            warn!(
                installation_id,
                account_login = %account.login,
                owner = %target.owner(),
                "Installation account differs from the repository owner"
            );
        }

        if let Err(e) = self
            .installations
            .upsert_installation(installation_id, &account.login, account.account_type)
            .await
        {
            warn!(
                installation_id,
                code = ?e.code(),
                detail = %e.detail(),
                "Failed to record installation; continuing"
            );
        }
    }
}

fn parse_installation_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id > 0)
}
