//! The repository a project is being connected to.

use crate::SetupError;

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;

/// A validated `(project, owner/repo)` pair.
///
/// Owner and repository names end up in GitHub API paths, so they are limited
/// to the characters GitHub allows in account and repository names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    project_id: String,
    owner: String,
    repo: String,
}

impl RepositoryTarget {
    /// # Errors
    ///
    /// Returns `SetupError::Validation` if any part is empty or a name has
    /// characters GitHub does not allow.
    pub fn new(
        project_id: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, SetupError> {
        let project_id = project_id.into();
        let owner = owner.into();
        let repo = repo.into();

        if project_id.trim().is_empty() {
            return Err(SetupError::Validation("projectId is required".to_string()));
        }
        validate_name("owner", &owner)?;
        validate_name("repo", &repo)?;
        if repo == "." || repo == ".." {
            return Err(SetupError::Validation(format!("repo '{repo}' is not a valid name")));
        }

        Ok(Self {
            project_id,
            owner,
            repo,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), SetupError> {
    if value.is_empty() {
        return Err(SetupError::Validation(format!("{field} is required")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(SetupError::Validation(format!(
            "{field} '{value}' contains invalid character '{c}'"
        )));
    }
    Ok(())
}
