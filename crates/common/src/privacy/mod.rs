//! Privacy strategies
//!
//! A [`PrivacyStrategy`] decides how every uploaded object (items and the
//! root manifest alike) is turned into stored bytes and back. The set of
//! schemes is closed:
//!
//! | scheme | type code | material |
//! |---|---|---|
//! | [`Scheme::Plain`] | 1001 | none |
//! | [`Scheme::SharedKey`] | 1002 | own Ed25519 key + counterpart public key |
//! | [`Scheme::ThresholdShared`] | 1003 | share map + total/threshold |
//! | [`Scheme::Password`] | 1004 | password of 50+ characters |
//!
//! All validation happens in the constructors, so a value of this type is
//! always usable. Strategies are immutable and cheap to clone; callers
//! build one per upload or download and pass it by reference.

mod password;
mod shared_key;
mod threshold;

use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::{PublicKey, SecretError, SecretKey, ShareMap};

pub use password::{KdfParams, PasswordStrategy, MINIMUM_PASSWORD_LENGTH, SALT_SIZE};
pub use shared_key::SharedKeyStrategy;
pub use threshold::ThresholdSharedStrategy;

#[derive(Debug, thiserror::Error)]
pub enum PrivacyError {
    #[error("invalid privacy strategy: {0}")]
    Validation(String),
    #[error("encryption failed: {0}")]
    Encryption(#[source] SecretError),
    #[error("decryption failed: {0}")]
    Decryption(#[source] SecretError),
    #[error("insufficient shares: need {required}, got {supplied}")]
    InsufficientShares { required: usize, supplied: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("crypto task failed: {0}")]
    Task(String),
}

/// Wire code identifying which scheme protected an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivacyType {
    Plain,
    SharedKey,
    ThresholdShared,
    Password,
}

impl PrivacyType {
    pub fn code(&self) -> u16 {
        match self {
            PrivacyType::Plain => 1001,
            PrivacyType::SharedKey => 1002,
            PrivacyType::ThresholdShared => 1003,
            PrivacyType::Password => 1004,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1001 => Some(PrivacyType::Plain),
            1002 => Some(PrivacyType::SharedKey),
            1003 => Some(PrivacyType::ThresholdShared),
            1004 => Some(PrivacyType::Password),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrivacyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrivacyType::Plain => "PLAIN",
            PrivacyType::SharedKey => "SHARED_KEY",
            PrivacyType::ThresholdShared => "THRESHOLD_SHARED",
            PrivacyType::Password => "PASSWORD",
        };
        write!(f, "{}", name)
    }
}

impl Serialize for PrivacyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for PrivacyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        PrivacyType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown privacy type {}", code)))
    }
}

/// The scheme-specific half of a strategy
#[derive(Debug, Clone)]
pub enum Scheme {
    Plain,
    Password(PasswordStrategy),
    SharedKey(SharedKeyStrategy),
    ThresholdShared(ThresholdSharedStrategy),
}

/// A validated, immutable privacy strategy plus its optional search tag
#[derive(Debug, Clone)]
pub struct PrivacyStrategy {
    scheme: Scheme,
    search_tag: Option<String>,
}

impl Default for PrivacyStrategy {
    fn default() -> Self {
        Self::plain()
    }
}

impl From<Scheme> for PrivacyStrategy {
    fn from(scheme: Scheme) -> Self {
        Self {
            scheme,
            search_tag: None,
        }
    }
}

impl PrivacyStrategy {
    /// Store data as-is.
    pub fn plain() -> Self {
        Scheme::Plain.into()
    }

    /// Encrypt under a key stretched from `password`.
    pub fn password(password: impl Into<String>) -> Result<Self, PrivacyError> {
        Ok(Scheme::Password(PasswordStrategy::new(password)?).into())
    }

    /// Encrypt under the key agreed between `own` and `counterpart`.
    pub fn shared_key(own: &SecretKey, counterpart: &PublicKey) -> Result<Self, PrivacyError> {
        Ok(Scheme::SharedKey(SharedKeyStrategy::new(own, counterpart)?).into())
    }

    /// Encrypt under a key held as threshold shares.
    pub fn threshold_shared(
        total_parts: usize,
        threshold: usize,
        shares: ShareMap,
    ) -> Result<Self, PrivacyError> {
        Ok(
            Scheme::ThresholdShared(ThresholdSharedStrategy::new(total_parts, threshold, shares)?)
                .into(),
        )
    }

    /// Attach a free-text tag recorded in the root manifest.
    pub fn with_search_tag(mut self, tag: impl Into<String>) -> Self {
        self.search_tag = Some(tag.into());
        self
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn privacy_type(&self) -> PrivacyType {
        match &self.scheme {
            Scheme::Plain => PrivacyType::Plain,
            Scheme::Password(_) => PrivacyType::Password,
            Scheme::SharedKey(_) => PrivacyType::SharedKey,
            Scheme::ThresholdShared(_) => PrivacyType::ThresholdShared,
        }
    }

    pub fn search_tag(&self) -> Option<&str> {
        self.search_tag.as_deref()
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        match &self.scheme {
            Scheme::Plain => Ok(data.to_vec()),
            Scheme::Password(strategy) => strategy.encrypt(data),
            Scheme::SharedKey(strategy) => strategy.encrypt(data),
            Scheme::ThresholdShared(strategy) => strategy.encrypt(data),
        }
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        match &self.scheme {
            Scheme::Plain => Ok(data.to_vec()),
            Scheme::Password(strategy) => strategy.decrypt(data),
            Scheme::SharedKey(strategy) => strategy.decrypt(data),
            Scheme::ThresholdShared(strategy) => strategy.decrypt(data),
        }
    }

    /// [`Self::encrypt`] on the blocking pool, off the async workers.
    pub async fn encrypt_blocking(
        self: Arc<Self>,
        data: impl AsRef<[u8]> + Send + 'static,
    ) -> Result<Vec<u8>, PrivacyError> {
        tokio::task::spawn_blocking(move || self.encrypt(data.as_ref()))
            .await
            .map_err(|e| PrivacyError::Task(e.to_string()))?
    }

    /// [`Self::decrypt`] on the blocking pool, off the async workers.
    pub async fn decrypt_blocking(
        self: Arc<Self>,
        data: impl AsRef<[u8]> + Send + 'static,
    ) -> Result<Vec<u8>, PrivacyError> {
        tokio::task::spawn_blocking(move || self.decrypt(data.as_ref()))
            .await
            .map_err(|e| PrivacyError::Task(e.to_string()))?
    }

    /// Buffer `reader`, encrypt it, and return a reader over the ciphertext.
    pub fn encrypt_reader<R: Read>(&self, mut reader: R) -> Result<impl Read, PrivacyError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(std::io::Cursor::new(self.encrypt(&data)?))
    }

    /// Buffer `reader`, decrypt it, and return a reader over the plaintext.
    pub fn decrypt_reader<R: Read>(&self, mut reader: R) -> Result<impl Read, PrivacyError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(std::io::Cursor::new(self.decrypt(&data)?))
    }
}
