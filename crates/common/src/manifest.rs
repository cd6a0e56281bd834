//! # Root manifest
//!
//! The root manifest is the single object that ties an upload together.
//! It records which privacy scheme protected the upload and, for every
//! item, where its ciphertext lives in the store and what digest it had.
//!
//! The manifest is itself encrypted with the upload's strategy and stored
//! like any item; the ledger only ever sees its content hash.
//!
//! ## Wire shape
//!
//! A DAG-CBOR map with camelCase keys:
//!
//! ```text
//! { privacyType: 1004, privacySearchTag?, storeType: "block",
//!   description?, version: "1.0",
//!   data: [ { digest?, dataHash, description?, metadata?,
//!             timestamp, name?, contentType? }, ... ] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::{BlockEncoded, CodecError};
use crate::privacy::PrivacyType;
use crate::store::ContentHash;

/// Schema version written into every manifest
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest must reference at least one item")]
    Empty,
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Hint recorded for readers about how the uploader laid out its objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Inline,
    #[default]
    Block,
}

impl std::str::FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(StoreType::Inline),
            "block" => Ok(StoreType::Block),
            other => Err(format!("unknown store type: {}", other)),
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::Inline => write!(f, "inline"),
            StoreType::Block => write!(f, "block"),
        }
    }
}

/// One stored item as the manifest remembers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub data_hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// Milliseconds since the Unix epoch, assigned by the uploader
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootManifest {
    privacy_type: PrivacyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    privacy_search_tag: Option<String>,
    #[serde(default)]
    store_type: StoreType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    version: String,
    data: Vec<ManifestEntry>,
}

impl BlockEncoded for RootManifest {}

impl RootManifest {
    pub fn new(
        privacy_type: PrivacyType,
        privacy_search_tag: Option<String>,
        store_type: StoreType,
        description: Option<String>,
        data: Vec<ManifestEntry>,
    ) -> Result<Self, ManifestError> {
        if data.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(Self {
            privacy_type,
            privacy_search_tag,
            store_type,
            description,
            version: SCHEMA_VERSION.to_string(),
            data,
        })
    }

    pub fn privacy_type(&self) -> PrivacyType {
        self.privacy_type
    }

    pub fn privacy_search_tag(&self) -> Option<&str> {
        self.privacy_search_tag.as_deref()
    }

    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn data(&self) -> &[ManifestEntry] {
        &self.data
    }

    pub fn entry(&self, index: usize) -> Option<&ManifestEntry> {
        self.data.get(index)
    }

    pub fn find_by_hash(&self, hash: &ContentHash) -> Option<&ManifestEntry> {
        self.data.iter().find(|entry| &entry.data_hash == hash)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(self.encode()?)
    }

    /// Decode and re-check the manifest invariants; a decoded manifest
    /// with no entries is as invalid as a constructed one.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ManifestError> {
        let manifest = Self::decode(data)?;
        if manifest.data.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(manifest)
    }
}
