use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::crypto::{Secret, SecretError, SECRET_SIZE};

use super::PrivacyError;

/// Shortest password accepted, in characters
pub const MINIMUM_PASSWORD_LENGTH: usize = 50;
/// Size of the random salt prepended to every ciphertext
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters
///
/// These are not recorded in the ciphertext: decrypting requires the same
/// parameters that were used to encrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PrivacyError> {
        let params = Self {
            memory_kib,
            iterations,
            parallelism,
        };
        params
            .argon2_params()
            .map_err(|e| PrivacyError::Validation(format!("invalid KDF parameters: {}", e)))?;
        Ok(params)
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    fn argon2_params(&self) -> Result<Params, argon2::Error> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(SECRET_SIZE),
        )
    }
}

/// Password-derived encryption
///
/// Every call draws a fresh salt and stretches the password with Argon2id
/// into a [`Secret`]. Output is `salt || nonce || ciphertext || tag`.
#[derive(Clone)]
pub struct PasswordStrategy {
    password: Zeroizing<String>,
    kdf: KdfParams,
}

impl std::fmt::Debug for PasswordStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordStrategy")
            .field("password", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl PasswordStrategy {
    pub fn new(password: impl Into<String>) -> Result<Self, PrivacyError> {
        let password = Zeroizing::new(password.into());
        let length = password.chars().count();
        if length < MINIMUM_PASSWORD_LENGTH {
            return Err(PrivacyError::Validation(format!(
                "password must be at least {} characters, got {}",
                MINIMUM_PASSWORD_LENGTH, length
            )));
        }
        Ok(Self {
            password,
            kdf: KdfParams::default(),
        })
    }

    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn kdf_params(&self) -> KdfParams {
        self.kdf
    }

    fn derive(&self, salt: &[u8]) -> Result<Secret, SecretError> {
        let params = self
            .kdf
            .argon2_params()
            .map_err(|e| anyhow::anyhow!("invalid KDF parameters: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; SECRET_SIZE]);
        argon2
            .hash_password_into(self.password.as_bytes(), salt, &mut key[..])
            .map_err(|e| anyhow::anyhow!("key derivation failed: {}", e))?;
        Ok(Secret::from(*key))
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        let mut salt = [0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| PrivacyError::Encryption(anyhow::anyhow!("salt: {}", e).into()))?;

        let secret = self.derive(&salt).map_err(PrivacyError::Encryption)?;
        let sealed = secret.encrypt(data).map_err(PrivacyError::Encryption)?;

        let mut out = Vec::with_capacity(SALT_SIZE + sealed.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        if data.len() < SALT_SIZE {
            return Err(PrivacyError::Decryption(SecretError::Truncated(data.len())));
        }
        let (salt, sealed) = data.split_at(SALT_SIZE);
        let secret = self.derive(salt).map_err(PrivacyError::Decryption)?;
        secret.decrypt(sealed).map_err(PrivacyError::Decryption)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PASSWORD: &str = "a passphrase that comfortably clears the fifty character floor";

    fn strategy(password: &str) -> PasswordStrategy {
        PasswordStrategy::new(password)
            .unwrap()
            .with_kdf_params(KdfParams::new(64, 1, 1).unwrap())
    }

    #[test]
    fn test_round_trip() {
        let strategy = strategy(PASSWORD);
        let encrypted = strategy.encrypt(b"hello").unwrap();
        assert_eq!(strategy.decrypt(&encrypted).unwrap(), b"hello");
    }

    #[test]
    fn test_fresh_salt_per_call() {
        let strategy = strategy(PASSWORD);
        let a = strategy.encrypt(b"same").unwrap();
        let b = strategy.encrypt(b"same").unwrap();
        assert_ne!(a[..SALT_SIZE], b[..SALT_SIZE]);
        assert_ne!(a, b);
        assert_eq!(strategy.decrypt(&a).unwrap(), b"same");
        assert_eq!(strategy.decrypt(&b).unwrap(), b"same");
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = strategy(PASSWORD).encrypt(b"hello").unwrap();
        let other = strategy(&PASSWORD.replace('a', "b"));
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(PrivacyError::Decryption(_))
        ));
    }

    #[test]
    fn test_mismatched_kdf_params_fail() {
        let encrypted = strategy(PASSWORD).encrypt(b"hello").unwrap();
        let other = strategy(PASSWORD).with_kdf_params(KdfParams::new(128, 1, 1).unwrap());
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_minimum_length() {
        let just_short: String = "p".repeat(MINIMUM_PASSWORD_LENGTH - 1);
        assert!(matches!(
            PasswordStrategy::new(just_short),
            Err(PrivacyError::Validation(_))
        ));
        assert!(PasswordStrategy::new("p".repeat(MINIMUM_PASSWORD_LENGTH)).is_ok());

        // counted in characters, not bytes
        let multibyte: String = "\u{00e9}".repeat(MINIMUM_PASSWORD_LENGTH - 1);
        assert!(PasswordStrategy::new(multibyte).is_err());
    }

    #[test]
    fn test_truncated_input() {
        let strategy = strategy(PASSWORD);
        assert!(matches!(
            strategy.decrypt(&[0u8; SALT_SIZE - 1]),
            Err(PrivacyError::Decryption(SecretError::Truncated(_)))
        ));
        assert!(strategy.decrypt(&[0u8; SALT_SIZE + 8]).is_err());
    }

    #[test]
    fn test_invalid_kdf_params() {
        assert!(KdfParams::new(0, 1, 1).is_err());
        assert!(KdfParams::new(64, 0, 1).is_err());
        assert_eq!(KdfParams::default().memory_kib(), Params::DEFAULT_M_COST);
    }
}
