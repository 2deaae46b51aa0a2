//! Key material for unit tests.

use std::sync::OnceLock;

use crypto_box::aead::OsRng;
use rand::thread_rng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

pub(crate) struct TestKeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

pub(crate) fn create_test_key_pair() -> TestKeyPair {
    let mut rng = thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate key");
    let public_key = RsaPublicKey::from(&private_key);

    TestKeyPair {
        private_pem: private_key
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .to_string(),
        public_pem: public_key.to_public_key_pem(LineEnding::LF).unwrap(),
    }
}

/// One RSA key pair shared by every test in the crate; generation is slow.
pub(crate) fn shared_test_key_pair() -> &'static TestKeyPair {
    static KEYS: OnceLock<TestKeyPair> = OnceLock::new();
    KEYS.get_or_init(create_test_key_pair)
}

/// A repository key pair as GitHub would hold it for Actions secrets.
pub(crate) fn create_repository_key_pair() -> crypto_box::SecretKey {
    crypto_box::SecretKey::generate(&mut OsRng)
}
