//! Error types for the repository connection flow.

use repo_connect_store::StoreError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// The step of secret provisioning that talks to GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStage {
    /// Minting the installation access token.
    Token,
    /// Fetching the repository's Actions public key.
    PublicKey,
    /// Uploading the sealed secret.
    CreateSecret,
}

impl ProvisioningStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStage::Token => "token",
            ProvisioningStage::PublicKey => "public-key",
            ProvisioningStage::CreateSecret => "create-secret",
        }
    }
}

impl std::fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    /// App credentials or other deployment settings are missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller sent something we cannot act on.
    #[error("Validation error: {0}")]
    Validation(String),

    /// GitHub rejected a request or returned something unusable.
    #[error("GitHub {stage} request failed{}", status_suffix(.status))]
    Upstream {
        stage: ProvisioningStage,
        /// HTTP status, when GitHub answered at all.
        status: Option<u16>,
        /// Response body or transport error text, for operators.
        body: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// No plaintext key could be produced for the project.
    #[error("No API key available: {0}")]
    KeyUnavailable(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" with status {s}"),
        None => String::new(),
    }
}

impl SetupError {
    /// Converts a GitHub client error raised during `stage`.
    ///
    /// Missing or invalid App credentials stay configuration errors; every
    /// other failure is attributed to GitHub.
    pub fn from_github(stage: ProvisioningStage, error: github_client::Error) -> Self {
        match error {
            github_client::Error::Configuration(msg) => SetupError::Configuration(msg),
            github_client::Error::Jwt(msg) => {
                SetupError::Configuration(format!("Cannot sign GitHub App assertion: {msg}"))
            }
            other => SetupError::Upstream {
                stage,
                status: other.status(),
                body: other
                    .body()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            },
        }
    }

    /// The provisioning stage, for upstream failures.
    pub fn stage(&self) -> Option<ProvisioningStage> {
        match self {
            SetupError::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
