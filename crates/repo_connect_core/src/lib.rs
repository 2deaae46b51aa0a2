//! # RepoConnect Core
//!
//! Connects a source repository to a project by depositing the project's API
//! key into the repository's GitHub Actions secrets.
//!
//! ## Overview
//!
//! The GitHub App is authorized once per owner (organization or user). After
//! that, any repository under the owner can be connected without visiting
//! GitHub again:
//!
//! 1. Look up the owner's installation ([`repo_connect_store::InstallationStore`])
//! 2. Issue a fresh project API key ([`ProjectKeyManager`])
//! 3. Seal it with the repository's public key and upload it ([`SecretProvisioner`])
//!
//! When the owner has no installation yet, the caller is sent to GitHub's
//! install screen with a state token ([`StateCodec`]) and
//! [`SetupService::complete_installation`] picks up from the redirect.
//!
//! ## Architecture
//!
//! All I/O goes through traits so the flow can be tested without GitHub or a database:
//! - [`github_client::GitHubAppApi`] for GitHub
//! - [`repo_connect_store::InstallationStore`] and [`repo_connect_store::ProjectKeyStore`] for storage

pub mod config;
pub mod errors;
pub mod project_keys;
pub mod provisioning;
pub mod service;
pub mod state;
pub mod target;

#[cfg(test)]
mod test_support;

pub use config::SetupConfig;
pub use errors::{ProvisioningStage, SetupError};
pub use project_keys::{IssuedKey, KeyPolicy, ProjectKeyManager};
pub use provisioning::{SecretProvisioner, SECRET_NAME};
pub use service::{CallbackFailure, CallbackOutcome, ConfigureOutcome, SetupService};
pub use state::{SetupState, StateCodec};
pub use target::RepositoryTarget;
