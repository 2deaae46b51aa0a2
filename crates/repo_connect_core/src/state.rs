//! State tokens carried through the GitHub App install redirect.
//!
//! A token is base64url (unpadded) JSON `{projectId, owner, repo}`. With a
//! signing secret the payload also holds an `exp` timestamp and the token
//! becomes `payload.signature`, where the signature is the base64url
//! HMAC-SHA256 of the payload segment.
//!
//! Decoding never fails loudly: anything malformed, tampered with or expired
//! decodes to `None`.

use std::time::Duration;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

/// base64url without padding on output, with or without padding on input.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What the install redirect needs to remember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupState {
    pub project_id: String,
    pub owner: String,
    pub repo: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    project_id: String,
    owner: String,
    repo: String,
    exp: Option<i64>,
}

#[derive(Clone)]
struct Signing {
    secret: SecretString,
    ttl: Duration,
}

/// Encodes and decodes [`SetupState`] tokens.
#[derive(Clone)]
pub struct StateCodec {
    signing: Option<Signing>,
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec")
            .field("signed", &self.signing.is_some())
            .finish()
    }
}

impl StateCodec {
    /// Plain base64url JSON, no integrity protection.
    pub fn unsigned() -> Self {
        Self { signing: None }
    }

    /// Signed tokens that expire `ttl` after they are issued.
    pub fn signed(secret: SecretString, ttl: Duration) -> Self {
        Self {
            signing: Some(Signing { secret, ttl }),
        }
    }

    /// Signed when a secret is given, unsigned otherwise.
    pub fn new(secret: Option<SecretString>, ttl: Duration) -> Self {
        match secret {
            Some(secret) => Self::signed(secret, ttl),
            None => Self::unsigned(),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signing.is_some()
    }

    pub fn encode(&self, state: &SetupState) -> String {
        self.encode_at(state, chrono::Utc::now().timestamp())
    }

    pub fn decode(&self, token: &str) -> Option<SetupState> {
        self.decode_at(token, chrono::Utc::now().timestamp())
    }

    /// Encodes as if the current time were `now` (seconds since the epoch).
    pub fn encode_at(&self, state: &SetupState, now: i64) -> String {
        match &self.signing {
            None => {
                let payload = serde_json::json!({
                    "projectId": state.project_id,
                    "owner": state.owner,
                    "repo": state.repo,
                });
                BASE64_URL.encode(payload.to_string())
            }
            Some(signing) => {
                let ttl = i64::try_from(signing.ttl.as_secs()).unwrap_or(i64::MAX);
                let payload = serde_json::json!({
                    "projectId": state.project_id,
                    "owner": state.owner,
                    "repo": state.repo,
                    "exp": now.saturating_add(ttl),
                });
                let payload = BASE64_URL.encode(payload.to_string());
                let signature = BASE64_URL.encode(sign(&signing.secret, payload.as_bytes()));
                format!("{payload}.{signature}")
            }
        }
    }

    /// Decodes as if the current time were `now` (seconds since the epoch).
    pub fn decode_at(&self, token: &str, now: i64) -> Option<SetupState> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        let payload = match &self.signing {
            None => decode_payload(token)?,
            Some(signing) => {
                let (payload_segment, signature) = token.split_once('.')?;
                let signature = BASE64_URL.decode(signature).ok()?;
                if !verify(&signing.secret, payload_segment.as_bytes(), &signature) {
                    debug!("State token signature mismatch");
                    return None;
                }
                let payload = decode_payload(payload_segment)?;
                match payload.exp {
                    Some(exp) if exp > now => payload,
                    _ => {
                        debug!("State token expired or has no expiry");
                        return None;
                    }
                }
            }
        };

        if payload.project_id.is_empty() || payload.owner.is_empty() || payload.repo.is_empty() {
            return None;
        }

        Some(SetupState {
            project_id: payload.project_id,
            owner: payload.owner,
            repo: payload.repo,
        })
    }
}

fn decode_payload(segment: &str) -> Option<StatePayload> {
    let bytes = BASE64_URL.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn new_mac(secret: &SecretString) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()
}

fn sign(secret: &SecretString, payload: &[u8]) -> Vec<u8> {
    match new_mac(secret) {
        Some(mut mac) => {
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
        None => Vec::new(),
    }
}

fn verify(secret: &SecretString, payload: &[u8], signature: &[u8]) -> bool {
    let Some(mut mac) = new_mac(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(signature).is_ok()
}
