//! HTTP request and response models
//!
//! These types exist only in the HTTP layer. Domain results from
//! `repo_connect_core` are converted into them by the handlers.

pub mod request;
pub mod response;

pub use request::{ConfigureRepositoryRequest, SetupCallbackQuery, SetupPageQuery};
pub use response::{ConfigureRepositoryResponse, HealthCheckResponse, NeedsInstallResponse};
