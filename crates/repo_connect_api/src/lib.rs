//! RepoConnect REST API
//!
//! HTTP endpoints for connecting a repository to a project through the
//! GitHub App:
//!
//! - `POST /api/github/configure-repo` for callers that already know the project and repository
//! - `GET /api/github/setup-callback` where GitHub redirects after the App is installed
//! - `GET /setup` and `GET /setup/complete`, the pages the callback lands on
//!
//! # Architecture
//!
//! This crate only translates HTTP to calls on
//! [`repo_connect_core::SetupService`] and back. Business logic must never
//! depend on it.

use std::sync::Arc;

use repo_connect_core::SetupService;

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pages;
pub mod routes;
pub mod server;

#[cfg(test)]
mod test_support;

pub use errors::{ApiError, ErrorResponse};
pub use models::{request, response};
pub use server::{ApiConfig, ApiServer};

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// Marks a visit to the setup pages that came straight from the install callback.
pub const CALLBACK_COOKIE: &str = "perceo_setup_callback";

/// Lifetime of [`CALLBACK_COOKIE`], in seconds.
pub const CALLBACK_COOKIE_MAX_AGE_SECS: u64 = 120;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub setup: Arc<SetupService>,
}

impl AppState {
    pub fn new(setup: SetupService) -> Self {
        Self {
            setup: Arc::new(setup),
        }
    }
}
