//! HTTP request handlers
//!
//! Handlers extract HTTP input, call [`repo_connect_core::SetupService`] and
//! translate the outcome back to HTTP. They hold no business logic.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use repo_connect_core::{CallbackOutcome, ConfigureOutcome};
use url::form_urlencoded;

use crate::{
    errors::ApiError,
    models::{
        ConfigureRepositoryRequest, ConfigureRepositoryResponse, HealthCheckResponse,
        NeedsInstallResponse, SetupCallbackQuery,
    },
    AppState, CALLBACK_COOKIE, CALLBACK_COOKIE_MAX_AGE_SECS,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// Path of the setup landing page that shows callback errors.
pub const SETUP_PATH: &str = "/setup";

/// Path of the setup landing page shown after a successful callback.
pub const SETUP_COMPLETE_PATH: &str = "/setup/complete";

/// Health check endpoint
///
/// GET /api/health
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Connect a repository to a project
///
/// POST /api/github/configure-repo
///
/// Returns `200` with `{ok, repo}` when the secret was written, or `404` with
/// `{needInstall, installUrl | state}` when the owner still has to install
/// the GitHub App.
pub async fn configure_repository(
    State(state): State<AppState>,
    payload: Result<Json<ConfigureRepositoryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected configure-repo body");
        ApiError::validation("Invalid JSON body")
    })?;

    let (project_id, owner, repo) = request
        .fields()
        .ok_or_else(|| ApiError::validation("Missing or invalid projectId, owner, or repo"))?;

    let outcome = state
        .setup
        .configure_repository(project_id, owner, repo)
        .await?;

    Ok(match outcome {
        ConfigureOutcome::Configured { repo } => (
            StatusCode::OK,
            Json(ConfigureRepositoryResponse::configured(repo)),
        )
            .into_response(),
        ConfigureOutcome::NeedsInstall { install_url, state } => (
            StatusCode::NOT_FOUND,
            Json(NeedsInstallResponse::new(install_url, state)),
        )
            .into_response(),
    })
}

/// GitHub App setup callback
///
/// GET /api/github/setup-callback?installation_id=..&state=..
///
/// Always redirects to one of the setup pages and sets the short-lived
/// [`CALLBACK_COOKIE`] marker.
pub async fn setup_callback(
    State(state): State<AppState>,
    query: Result<Query<SetupCallbackQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable setup callback query");
            SetupCallbackQuery::default()
        }
    };

    let outcome = state
        .setup
        .complete_installation(query.installation_id.as_deref(), query.state.as_deref())
        .await;

    let location = redirect_location(&outcome);
    (
        AppendHeaders([(header::SET_COOKIE, callback_cookie())]),
        Redirect::temporary(&location),
    )
        .into_response()
}

/// Builds the setup page URL for a callback outcome.
pub(crate) fn redirect_location(outcome: &CallbackOutcome) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    let path = match outcome {
        CallbackOutcome::Completed { repo } => {
            query.append_pair("repo", repo);
            SETUP_COMPLETE_PATH
        }
        CallbackOutcome::Failed(failure) => {
            query.append_pair("error", failure.as_tag());
            SETUP_PATH
        }
    };
    format!("{path}?{}", query.finish())
}

fn callback_cookie() -> String {
    format!(
        "{CALLBACK_COOKIE}=1; Max-Age={CALLBACK_COOKIE_MAX_AGE_SECS}; HttpOnly; Path={SETUP_PATH}; SameSite=Lax"
    )
}
