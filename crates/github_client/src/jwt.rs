//! GitHub App credential signing.
//!
//! GitHub authenticates an App through a short-lived RS256 JWT signed with the
//! App's private key. That assertion is only ever used to mint installation
//! access tokens or to read installation metadata.
//!
//! The app ID and private key are checked when an assertion is requested, not
//! when the signer is built, so a misconfigured deployment only fails the
//! requests that actually need to talk to GitHub as the App.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::Error;

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;

/// Lifetime of a signed app assertion, in seconds.
pub const ASSERTION_TTL_SECS: u64 = 60;

/// JWT claims for GitHub App authentication.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Issued at, seconds since the epoch.
    pub iat: u64,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// The GitHub App ID.
    pub iss: String,
}

/// Where the App's PEM private key comes from.
#[derive(Clone)]
pub enum PrivateKeySource {
    /// The PEM text itself.
    Inline(SecretString),
    /// A path to a file holding the PEM text. Read every time a key is needed.
    File(PathBuf),
}

impl PrivateKeySource {
    /// Creates an inline key source, restoring newlines that were escaped as
    /// a literal `\n` so the key fits in a single environment variable.
    pub fn inline(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        PrivateKeySource::Inline(SecretString::from(raw.replace("\\n", "\n")))
    }

    /// Creates a key source that reads the PEM from a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        PrivateKeySource::File(path.into())
    }

    /// Loads the PEM text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the file cannot be read or the key is empty.
    pub async fn resolve(&self) -> Result<SecretString, Error> {
        let pem = match self {
            PrivateKeySource::Inline(secret) => secret.clone(),
            PrivateKeySource::File(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read GitHub App private key file"
                    );
                    Error::Configuration(format!(
                        "Failed to read private key file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                SecretString::from(contents)
            }
        };

        if pem.expose_secret().trim().is_empty() {
            return Err(Error::Configuration(
                "GitHub App private key is empty".to_string(),
            ));
        }

        Ok(pem)
    }
}

impl std::fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivateKeySource::Inline(_) => write!(f, "PrivateKeySource::Inline([REDACTED])"),
            PrivateKeySource::File(path) => write!(f, "PrivateKeySource::File({:?})", path),
        }
    }
}

/// Builds signed app assertions for a single GitHub App.
#[derive(Debug, Clone)]
pub struct AppCredentialSigner {
    app_id: Option<u64>,
    private_key: Option<PrivateKeySource>,
}

impl AppCredentialSigner {
    /// Creates a signer. Either value may be absent; absence is reported when
    /// an assertion is requested.
    pub fn new(app_id: Option<u64>, private_key: Option<PrivateKeySource>) -> Self {
        Self {
            app_id,
            private_key,
        }
    }

    /// Produces a signed assertion valid for [`ASSERTION_TTL_SECS`] seconds.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` if the app ID or private key is missing or unreadable.
    /// - `Error::Jwt` if the key is not a valid RSA PEM key.
    #[instrument(skip(self))]
    pub async fn create_assertion(&self) -> Result<SecretString, Error> {
        let app_id = self.app_id.ok_or_else(|| {
            Error::Configuration("PERCEO_GITHUB_APP_ID is not set".to_string())
        })?;

        let source = self.private_key.as_ref().ok_or_else(|| {
            Error::Configuration(
                "PERCEO_GITHUB_APP_PRIVATE_KEY or PERCEO_GITHUB_APP_PRIVATE_KEY_PATH is not set"
                    .to_string(),
            )
        })?;
        let pem = source.resolve().await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Jwt(format!("System time error: {e}")))?
            .as_secs();

        let token = sign_app_assertion(app_id, pem.expose_secret(), now)?;
        Ok(SecretString::from(token))
    }
}

/// Signs an app assertion issued at `issued_at` with the given PEM key.
///
/// The result is the standard three segment JWT: base64url header and
/// payload joined by `.` and followed by the RSA-SHA256 signature over them.
pub fn sign_app_assertion(
    app_id: u64,
    private_key_pem: &str,
    issued_at: u64,
) -> Result<String, Error> {
    let claims = Claims {
        iat: issued_at,
        exp: issued_at + ASSERTION_TTL_SECS,
        iss: app_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
        error!(
            app_id = app_id,
            error = %e,
            "Failed to parse RSA private key - key format is invalid"
        );
        Error::Jwt(format!("Invalid RSA private key: {e}"))
    })?;

    let token = encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| Error::Jwt(format!("Failed to encode JWT: {e}")))?;

    debug!(app_id = app_id, exp = claims.exp, "Generated GitHub App JWT");

    Ok(token)
}
