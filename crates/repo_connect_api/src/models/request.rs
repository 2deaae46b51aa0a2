//! HTTP request type definitions

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// Body of `POST /api/github/configure-repo`.
///
/// Every field is optional at the serde level so a missing field is reported
/// with the same message as an empty one.
///
/// # Example
///
/// ```json
/// {
///   "projectId": "proj_123",
///   "owner": "acme",
///   "repo": "web"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRepositoryRequest {
    pub project_id: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
}

impl ConfigureRepositoryRequest {
    /// Returns `(project_id, owner, repo)` when all three are present and non-blank.
    pub fn fields(&self) -> Option<(&str, &str, &str)> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        Some((
            non_blank(&self.project_id)?,
            non_blank(&self.owner)?,
            non_blank(&self.repo)?,
        ))
    }
}

/// Query string GitHub sends to the setup callback.
///
/// GitHub also sends `setup_action`, which is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupCallbackQuery {
    pub installation_id: Option<String>,
    pub state: Option<String>,
}

/// Query string of the setup landing pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupPageQuery {
    pub error: Option<String>,
    pub repo: Option<String>,
}
