//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Errors that originate from a GitHub response keep the
//! HTTP status and the raw response body so operators can diagnose permission or
//! installation problems without re-running the request.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.create_installation_token(installation_id).await {
///     Ok(token) => println!("Token expires at {:?}", token.expires_at),
///     Err(Error::Configuration(msg)) => eprintln!("GitHub App not configured: {}", msg),
///     Err(Error::UnexpectedStatus { status, .. }) => eprintln!("GitHub returned {}", status),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The GitHub App credentials are missing or unusable.
    ///
    /// This error occurs when:
    /// - The app ID has not been configured
    /// - Neither an inline private key nor a key file path has been configured
    /// - The key file cannot be read
    ///
    /// It is raised when a request needs to sign, never at start-up.
    #[error("GitHub App is not configured: {0}")]
    Configuration(String),

    /// Failure to build the signed app assertion.
    ///
    /// The private key was available but could not be parsed as an RSA PEM key,
    /// or the token could not be encoded.
    #[error("Failed to create the GitHub App JWT: {0}")]
    Jwt(String),

    /// Failure to build an HTTP client for the GitHub API.
    #[error("Failed to initialize the GitHub client: {0}")]
    ClientBuild(String),

    /// The request could not be sent or the response could not be read.
    #[error("GitHub request failed: {0}")]
    Transport(String),

    /// GitHub answered with a non-success status code.
    ///
    /// The body is kept verbatim for diagnosis. It never contains secret
    /// material because only public keys and encrypted values are sent.
    #[error("GitHub returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The GitHub API returned a success status with a body that is missing
    /// required fields or cannot be parsed.
    #[error("Invalid response from GitHub: {0}")]
    InvalidResponse(String),

    /// The repository public key could not be used to seal a secret.
    #[error("Invalid repository public key: {0}")]
    InvalidPublicKey(String),
}

impl Error {
    /// The HTTP status GitHub returned, if this error came from a GitHub response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body GitHub returned, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}
