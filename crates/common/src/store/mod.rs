//! Content-addressed byte storage
//!
//! The orchestrators only need two things from a store: hand it bytes
//! and get back a content hash, and hand it a hash and get back the
//! bytes. [`BlobsStore`] is the bundled implementation.

mod blobs_store;

use std::fmt::{Debug, Display};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use blobs_store::{BlobsStore, BlobsStoreError};

/// Size of a content hash in bytes
pub const CONTENT_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
#[error("invalid content hash: {0}")]
pub struct ContentHashError(String);

/// BLAKE3 hash of stored bytes, rendered as lower-case hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; CONTENT_HASH_SIZE]);

impl ContentHash {
    /// Hash `data` the same way every store addresses it.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; CONTENT_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_SIZE] {
        &self.0
    }

    pub fn from_hex(hex: &str) -> Result<Self, ContentHashError> {
        let mut buff = [0u8; CONTENT_HASH_SIZE];
        hex::decode_to_slice(hex.trim(), &mut buff)
            .map_err(|e| ContentHashError(format!("{}: {}", hex, e)))?;
        Ok(Self(buff))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ContentHash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[async_trait]
pub trait Store: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist `data` and return its content hash.
    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, Self::Error>;

    /// Fetch the bytes previously stored under `hash`.
    ///
    /// An unknown hash is an error, not an empty result.
    async fn get(&self, hash: &ContentHash) -> Result<Bytes, Self::Error>;
}
