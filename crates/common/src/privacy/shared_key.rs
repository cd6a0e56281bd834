use crate::crypto::{PublicKey, Secret, SecretKey};

use super::PrivacyError;

/// Domain separation for turning an X25519 shared point into a content key
const SHARED_KEY_CONTEXT: &str = "sealbox 2024 shared-key privacy strategy";

/// Encryption under a key agreed between two Ed25519 identities
///
/// Both keys are mapped to X25519, the Diffie-Hellman output is run through
/// BLAKE3's key derivation mode, and the result encrypts exactly like a
/// [`Secret`]. Either party can decrypt by swapping which key is private.
#[derive(Debug, Clone)]
pub struct SharedKeyStrategy {
    counterpart: PublicKey,
    secret: Secret,
}

impl SharedKeyStrategy {
    pub fn new(own: &SecretKey, counterpart: &PublicKey) -> Result<Self, PrivacyError> {
        let their_x25519 = counterpart
            .to_x25519()
            .map_err(|e| PrivacyError::Validation(format!("counterpart key: {}", e)))?;
        let shared = own.to_x25519().diffie_hellman(&their_x25519);
        if !shared.was_contributory() {
            return Err(PrivacyError::Validation(
                "counterpart key is a low-order point".to_string(),
            ));
        }

        let key = blake3::derive_key(SHARED_KEY_CONTEXT, shared.as_bytes());
        Ok(Self {
            counterpart: *counterpart,
            secret: Secret::from(key),
        })
    }

    pub fn counterpart(&self) -> &PublicKey {
        &self.counterpart
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        self.secret.encrypt(data).map_err(PrivacyError::Encryption)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        self.secret.decrypt(data).map_err(PrivacyError::Decryption)
    }
}
