//! Deployment configuration for the connection flow.
//!
//! Built once at start-up and handed to the components that need it. App
//! credentials are optional here: their absence is reported by the signer
//! when a request first needs them.

use std::time::Duration;

use github_client::{AppCredentialSigner, GitHubClient, PrivateKeySource, GITHUB_API_URL};
use secrecy::SecretString;

use crate::project_keys::KeyPolicy;
use crate::SetupError;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

pub const ENV_APP_ID: &str = "PERCEO_GITHUB_APP_ID";
pub const ENV_PRIVATE_KEY: &str = "PERCEO_GITHUB_APP_PRIVATE_KEY";
pub const ENV_PRIVATE_KEY_PATH: &str = "PERCEO_GITHUB_APP_PRIVATE_KEY_PATH";
pub const ENV_INSTALL_URL: &str = "PERCEO_GITHUB_APP_INSTALL_URL";
pub const ENV_API_URL: &str = "PERCEO_GITHUB_API_URL";
pub const ENV_STATE_SECRET: &str = "PERCEO_SETUP_STATE_SECRET";
pub const ENV_STATE_TTL_SECS: &str = "PERCEO_SETUP_STATE_TTL_SECS";
pub const ENV_ROTATE_KEY_ON_ENSURE: &str = "PERCEO_ROTATE_KEY_ON_ENSURE";

/// Default lifetime of a signed state token.
pub const DEFAULT_STATE_TTL_SECS: u64 = 3600;

const INSTALL_PATH: &str = "/installations/new";

#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub app_id: Option<u64>,
    pub private_key: Option<PrivateKeySource>,
    /// Where users install the App, already ending in `/installations/new`.
    pub install_url: Option<String>,
    pub api_base_url: String,
    /// Enables signed state tokens.
    pub state_secret: Option<SecretString>,
    pub state_ttl: Duration,
    pub key_policy: KeyPolicy,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            install_url: None,
            api_base_url: GITHUB_API_URL.to_string(),
            state_secret: None,
            state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
            key_policy: KeyPolicy::default(),
        }
    }
}

impl SetupConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::Configuration` if a variable is set to a value that
    /// cannot be parsed. Unset variables are never an error here.
    pub fn from_env() -> Result<Self, SetupError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SetupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let app_id = get(ENV_APP_ID)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| {
                    SetupError::Configuration(format!("{ENV_APP_ID} must be a number, got '{v}'"))
                })
            })
            .transpose()?;

        // A key file wins over an inline key.
        let private_key = match (get(ENV_PRIVATE_KEY_PATH), get(ENV_PRIVATE_KEY)) {
            (Some(path), _) => Some(PrivateKeySource::file(path)),
            (None, Some(inline)) => Some(PrivateKeySource::inline(inline)),
            (None, None) => None,
        };

        let state_ttl = match get(ENV_STATE_TTL_SECS) {
            Some(v) => Duration::from_secs(v.trim().parse::<u64>().map_err(|_| {
                SetupError::Configuration(format!(
                    "{ENV_STATE_TTL_SECS} must be a number of seconds, got '{v}'"
                ))
            })?),
            None => Duration::from_secs(DEFAULT_STATE_TTL_SECS),
        };

        let key_policy = match get(ENV_ROTATE_KEY_ON_ENSURE) {
            Some(v) => KeyPolicy::from_rotate_flag(parse_flag(&v).ok_or_else(|| {
                SetupError::Configuration(format!(
                    "{ENV_ROTATE_KEY_ON_ENSURE} must be true or false, got '{v}'"
                ))
            })?),
            None => KeyPolicy::default(),
        };

        Ok(Self {
            app_id,
            private_key,
            install_url: get(ENV_INSTALL_URL).map(|v| normalize_install_url(&v)),
            api_base_url: get(ENV_API_URL).unwrap_or_else(|| GITHUB_API_URL.to_string()),
            state_secret: get(ENV_STATE_SECRET).map(SecretString::from),
            state_ttl,
            key_policy,
        })
    }

    /// A signer for the configured App. Missing credentials surface when it signs.
    pub fn signer(&self) -> AppCredentialSigner {
        AppCredentialSigner::new(self.app_id, self.private_key.clone())
    }

    pub fn github_client(&self) -> GitHubClient {
        GitHubClient::with_base_uri(self.signer(), self.api_base_url.clone())
    }
}

/// Appends `/installations/new` to an App's public URL unless already present.
pub fn normalize_install_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.ends_with(INSTALL_PATH) {
        raw.to_string()
    } else {
        format!("{}{}", raw.trim_end_matches('/'), INSTALL_PATH)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
