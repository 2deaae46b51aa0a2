//! Error handling and HTTP error conversion
//!
//! Domain errors from `repo_connect_core` are converted to HTTP responses at
//! this boundary. GitHub response bodies and database details are logged
//! server-side and never sent to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repo_connect_core::SetupError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, type varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Axum response wrapper for API errors
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>) -> Result<Response, ApiError> {
///     let outcome = state.setup.configure_repository(..).await?;
///     Ok(Json(outcome).into_response())
/// }
/// ```
#[derive(Debug)]
pub struct ApiError(SetupError);

impl ApiError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError(SetupError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

impl From<SetupError> for ApiError {
    fn from(err: SetupError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = convert_error(&self.0);

        // Log error server-side
        log_error(&self.0, status);

        (status, Json(error_response)).into_response()
    }
}

fn status_for(error: &SetupError) -> StatusCode {
    match error {
        SetupError::Validation(_) => StatusCode::BAD_REQUEST,
        SetupError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        SetupError::Configuration(_) | SetupError::Storage(_) | SetupError::KeyUnavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convert domain error to HTTP status code and error response
fn convert_error(error: &SetupError) -> (StatusCode, ErrorResponse) {
    let (code, message, details) = match error {
        SetupError::Validation(msg) => ("ValidationError", msg.clone(), None),
        SetupError::Upstream { stage, status, .. } => (
            "UpstreamError",
            "Failed to set repository secret in GitHub".to_string(),
            Some(json!({
                "stage": stage.as_str(),
                "status": status,
            })),
        ),
        SetupError::Storage(_) => (
            "StorageError",
            "Could not create or find API key for this project".to_string(),
            None,
        ),
        SetupError::KeyUnavailable(_) => (
            "KeyUnavailable",
            "Could not create or find API key for this project".to_string(),
            None,
        ),
        SetupError::Configuration(_) => (
            "ConfigurationError",
            "The GitHub App is not configured on this server".to_string(),
            None,
        ),
    };

    (
        status_for(error),
        ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
                details,
            },
        },
    )
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &SetupError, status: StatusCode) {
    match error {
        SetupError::Upstream {
            stage,
            status: upstream_status,
            body,
        } => {
            tracing::error!(
                stage = %stage,
                upstream_status = ?upstream_status,
                body = %body,
                "API error: {} - {}",
                status,
                error
            );
        }
        _ if status.is_server_error() => {
            tracing::error!("API error: {} - {}", status, error);
        }
        _ => {
            tracing::warn!("API error: {} - {}", status, error);
        }
    }
}
