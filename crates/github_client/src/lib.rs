//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for the handful of GitHub App endpoints needed
//! to deposit an Actions secret in a repository:
//!
//! 1. Authenticate as the App with a signed JWT ([`jwt::AppCredentialSigner`])
//! 2. Mint an installation access token
//! 3. Fetch the repository's Actions public key
//! 4. Seal the secret value ([`secrets::seal_secret`])
//! 5. Upload the sealed value as a repository secret
//!
//! Every call goes through [`GitHubAppApi`] so business logic can be tested
//! against mocks. Requests are made with octocrab's raw HTTP methods so that
//! non-success responses keep their status code and body.

use async_trait::async_trait;
use http::header::HeaderName;
use http::StatusCode;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, instrument, warn};

pub mod errors;
pub use errors::Error;

pub mod installation;
pub use installation::{AccountType, InstallationAccount};

pub mod jwt;
pub use jwt::{AppCredentialSigner, PrivateKeySource};

pub mod models;
pub use models::{EncryptedSecret, InstallationToken, RepositoryPublicKey};

pub mod secrets;
pub use secrets::seal_secret;

#[cfg(test)]
mod test_keys;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// The public GitHub REST API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Value sent in the `X-GitHub-Api-Version` header on every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// The GitHub operations needed to provision repository secrets.
#[async_trait]
pub trait GitHubAppApi: Send + Sync {
    /// Looks up the account that owns an installation.
    ///
    /// Returns `None` on any failure: missing credentials, a non-success
    /// response, or a body without an account login.
    async fn get_installation_account(&self, installation_id: u64) -> Option<InstallationAccount>;

    /// Mints an installation access token, authenticating as the App.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` / `Error::Jwt` if the App cannot sign.
    /// - `Error::UnexpectedStatus` if GitHub rejects the request.
    /// - `Error::InvalidResponse` if the response has no token.
    async fn create_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken, Error>;

    /// Fetches the public key used to seal Actions secrets for a repository.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedStatus` if GitHub rejects the request.
    /// - `Error::InvalidResponse` if `key` or `key_id` is missing.
    async fn get_repository_public_key(
        &self,
        token: &InstallationToken,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryPublicKey, Error>;

    /// Creates or replaces an Actions secret on a repository.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedStatus` if GitHub rejects the request.
    async fn put_repository_secret(
        &self,
        token: &InstallationToken,
        owner: &str,
        repo: &str,
        secret_name: &str,
        secret: &EncryptedSecret,
    ) -> Result<(), Error>;
}

/// A client for interacting with the GitHub API as a GitHub App.
///
/// Each request builds a client authenticated with the bearer token that
/// request needs: the App JWT for installation endpoints, the installation
/// token for repository endpoints. Nothing is cached between calls and
/// failed requests are not retried.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    signer: AppCredentialSigner,
    base_uri: String,
}

impl GitHubClient {
    /// Creates a client for the public GitHub API.
    pub fn new(signer: AppCredentialSigner) -> Self {
        Self::with_base_uri(signer, GITHUB_API_URL)
    }

    /// Creates a client for a different API root, e.g. GitHub Enterprise or a test server.
    pub fn with_base_uri(signer: AppCredentialSigner, base_uri: impl Into<String>) -> Self {
        let base_uri = base_uri.into();
        Self {
            signer,
            base_uri: base_uri.trim_end_matches('/').to_string(),
        }
    }

    fn bearer_client(&self, token: &SecretString) -> Result<Octocrab, Error> {
        Octocrab::builder()
            .base_uri(self.base_uri.as_str())
            .map_err(|e| {
                error!(base_uri = %self.base_uri, error = %e, "Invalid GitHub API base URI");
                Error::ClientBuild(format!("Invalid base URI '{}': {}", self.base_uri, e))
            })?
            .personal_token(token.expose_secret().to_string())
            .add_retry_config(RetryConfig::None)
            .add_header(
                HeaderName::from_static("x-github-api-version"),
                GITHUB_API_VERSION.to_string(),
            )
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build Octocrab client");
                Error::ClientBuild(e.to_string())
            })
    }

    async fn app_client(&self) -> Result<Octocrab, Error> {
        let assertion = self.signer.create_assertion().await?;
        self.bearer_client(&assertion)
    }
}

#[async_trait]
impl GitHubAppApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_installation_account(&self, installation_id: u64) -> Option<InstallationAccount> {
        let client = match self.app_client().await {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    installation_id,
                    error = %e,
                    "Cannot look up installation account without App credentials"
                );
                return None;
            }
        };

        let path = format!("/app/installations/{}", installation_id);
        let operation = "Failed to get installation";
        let result = match client._get(path).await {
            Ok(response) => {
                let status = response.status();
                match client.body_to_string(response).await {
                    Ok(body) => check_status(operation, status, body),
                    Err(e) => Err(transport_error(operation, e)),
                }
            }
            Err(e) => Err(transport_error(operation, e)),
        };
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!(installation_id, error = %e, "Failed to fetch installation");
                return None;
            }
        };

        let parsed: installation::InstallationResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                warn!(installation_id, error = %e, "Installation response is not valid JSON");
                return None;
            }
        };

        let account = parsed.into_account();
        match &account {
            Some(a) => info!(
                installation_id,
                account_login = %a.login,
                account_type = %a.account_type,
                "Resolved installation account"
            ),
            None => warn!(installation_id, "Installation response has no account login"),
        }
        account
    }

    #[instrument(skip(self))]
    async fn create_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken, Error> {
        let client = self.app_client().await?;

        info!(
            installation_id,
            "Requesting installation token from GitHub API"
        );
        let path = format!("/app/installations/{}/access_tokens", installation_id);
        let operation = "Failed to create installation token";
        let response = client
            ._post(path, None::<&()>)
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = response.status();
        let body = client
            .body_to_string(response)
            .await
            .map_err(|e| transport_error(operation, e))?;
        let body = check_status(operation, status, body)?;

        let parsed: models::InstallationTokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::InvalidResponse(format!("token response is not valid JSON: {e}")))?;
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidResponse("token response missing token".to_string()))?;

        info!(installation_id, "Successfully retrieved installation token");
        Ok(InstallationToken {
            token: SecretString::from(token),
            expires_at: parsed.expires_at,
        })
    }

    #[instrument(skip(self, token), fields(owner = %owner, repo = %repo))]
    async fn get_repository_public_key(
        &self,
        token: &InstallationToken,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryPublicKey, Error> {
        let client = self.bearer_client(&token.token)?;

        let path = format!("/repos/{}/{}/actions/secrets/public-key", owner, repo);
        let operation = "Failed to get repository public key";
        let response = client
            ._get(path)
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = response.status();
        let body = client
            .body_to_string(response)
            .await
            .map_err(|e| transport_error(operation, e))?;
        let body = check_status(operation, status, body)?;

        let parsed: models::PublicKeyResponse = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!("public key response is not valid JSON: {e}"))
        })?;
        let key = parsed.into_public_key().ok_or_else(|| {
            Error::InvalidResponse("public key response missing key or key_id".to_string())
        })?;

        debug!(key_id = %key.key_id, "Fetched repository public key");
        Ok(key)
    }

    #[instrument(skip(self, token, secret), fields(owner = %owner, repo = %repo))]
    async fn put_repository_secret(
        &self,
        token: &InstallationToken,
        owner: &str,
        repo: &str,
        secret_name: &str,
        secret: &EncryptedSecret,
    ) -> Result<(), Error> {
        let client = self.bearer_client(&token.token)?;

        let path = format!(
            "/repos/{}/{}/actions/secrets/{}",
            owner, repo, secret_name
        );
        let operation = "Failed to create repository secret";
        let response = client
            ._put(path, Some(secret))
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = response.status();
        let body = client
            .body_to_string(response)
            .await
            .map_err(|e| transport_error(operation, e))?;
        check_status(operation, status, body)?;

        info!(
            owner = owner,
            repo = repo,
            secret_name = secret_name,
            key_id = %secret.key_id,
            "Repository secret written"
        );
        Ok(())
    }
}

/// Passes success bodies through and turns any other status into
/// `Error::UnexpectedStatus`, keeping the body for diagnosis.
fn check_status(operation: &str, status: StatusCode, body: String) -> Result<String, Error> {
    if !status.is_success() {
        error!(
            status = status.as_u16(),
            body = %body,
            "{}. Received an error from GitHub",
            operation
        );
        return Err(Error::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

fn transport_error(operation: &str, e: octocrab::Error) -> Error {
    log_octocrab_error(operation, &e);
    Error::Transport(e.to_string())
}

fn log_octocrab_error(message: &str, e: &octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, .. } => error!(
            error_message = %source.message,
            "{}. Received an error from GitHub", message
        ),
        octocrab::Error::UriParse { source, .. } => error!(
            error_message = source.to_string(),
            "{}. Failed to parse URI.", message
        ),
        octocrab::Error::Uri { source, .. } => error!(
            error_message = source.to_string(),
            "{}, Failed to parse URI.", message
        ),
        octocrab::Error::InvalidHeaderValue { source, .. } => error!(
            error_message = source.to_string(),
            "{}. One of the header values was invalid.", message
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
