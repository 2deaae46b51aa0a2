//! HTTP response type definitions
//!
//! Response types use camelCase for JSON serialization and are built from
//! `repo_connect_core` outcomes.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// `200 OK` body of `POST /api/github/configure-repo`.
///
/// ```json
/// { "ok": true, "repo": "acme/web" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRepositoryResponse {
    pub ok: bool,

    /// `owner/repo` that received the secret
    pub repo: String,
}

impl ConfigureRepositoryResponse {
    pub fn configured(repo: impl Into<String>) -> Self {
        Self {
            ok: true,
            repo: repo.into(),
        }
    }
}

/// `404 Not Found` body of `POST /api/github/configure-repo` when the owner
/// has not installed the GitHub App.
///
/// Exactly one of `install_url` and `state` is present.
///
/// ```json
/// { "needInstall": true, "installUrl": "https://github.com/apps/perceo/installations/new?state=..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsInstallResponse {
    pub need_install: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl NeedsInstallResponse {
    pub fn new(install_url: Option<String>, state: Option<String>) -> Self {
        Self {
            need_install: true,
            install_url,
            state,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Service status ("healthy")
    pub status: String,

    /// Crate version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// RFC 3339 timestamp of the check
    pub timestamp: String,
}
