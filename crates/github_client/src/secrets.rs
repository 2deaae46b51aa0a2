//! Client-side encryption for GitHub Actions secrets.
//!
//! GitHub never accepts plaintext secret values. Each value is sealed with the
//! repository's Curve25519 public key using an anonymous sealed box
//! (libsodium `crypto_box_seal`), so only GitHub can open it. Sealing is not
//! deterministic: every call uses a fresh ephemeral key pair.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, KEY_SIZE};
use tracing::debug;

use crate::Error;

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;

/// Seals `secret_value` for the repository public key `public_key_base64`.
///
/// Both the key and the returned ciphertext use standard (not URL-safe)
/// base64, matching the GitHub secrets API.
///
/// # Errors
///
/// Returns `Error::InvalidPublicKey` if the key is not valid base64 or is not
/// a 32 byte Curve25519 key.
pub fn seal_secret(public_key_base64: &str, secret_value: &str) -> Result<String, Error> {
    let key_bytes = STANDARD
        .decode(public_key_base64.trim())
        .map_err(|e| Error::InvalidPublicKey(format!("public key is not valid base64: {e}")))?;

    let key_bytes: [u8; KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
        Error::InvalidPublicKey(format!(
            "public key must be {} bytes, got {}",
            KEY_SIZE,
            key_bytes.len()
        ))
    })?;
    let public_key = PublicKey::from(key_bytes);

    let sealed = public_key
        .seal(&mut OsRng, secret_value.as_bytes())
        .map_err(|e| Error::InvalidPublicKey(format!("failed to seal secret: {e}")))?;

    debug!(sealed_len = sealed.len(), "Sealed secret for repository");

    Ok(STANDARD.encode(sealed))
}
