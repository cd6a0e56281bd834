//! Ledger anchoring
//!
//! Anchoring an upload turns its root hash into a [`TransactionRef`] that
//! can later be resolved back to the root hash, the root digest, and the
//! two parties. Every [`AnchorRecord`] is signed by the sender, and
//! ledgers check that signature before handing a record back.

mod fs;
mod memory;

use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codec::{BlockEncoded, CodecError};
use crate::crypto::{PublicKey, SecretKey, Signature};
use crate::store::{ContentHash, ContentHashError};

pub use fs::FsLedger;
pub use memory::MemoryLedger;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("transaction not found: {0}")]
    NotFound(TransactionRef),
    #[error("anchor record for {0} failed verification: {1}")]
    Verification(TransactionRef, String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("ledger i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger record error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("ledger error: {0}")]
    Internal(String),
}

/// Identifier of an anchored record: BLAKE3 of its signed encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRef(ContentHash);

impl TransactionRef {
    pub fn from_hex(hex: &str) -> Result<Self, ContentHashError> {
        Ok(Self(ContentHash::from_hex(hex)?))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl std::str::FromStr for TransactionRef {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Display for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionRef({})", self.0)
    }
}

/// The signed portion of an anchor record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnchorPayload<'a> {
    root_hash: &'a ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<&'a str>,
    sender: &'a PublicKey,
    recipient: &'a PublicKey,
    timestamp: i64,
}

/// What a ledger remembers about one anchored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRecord {
    pub root_hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub sender: PublicKey,
    pub recipient: PublicKey,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Hex Ed25519 signature by `sender` over the other fields
    pub signature: String,
}

impl BlockEncoded for AnchorRecord {}

impl AnchorRecord {
    /// Build and sign a record stamped with the current time.
    pub fn sign(
        root_hash: &ContentHash,
        digest: Option<&str>,
        sender: &SecretKey,
        recipient: &PublicKey,
    ) -> Result<Self, LedgerError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let sender_public = sender.public();
        let payload = AnchorPayload {
            root_hash,
            digest,
            sender: &sender_public,
            recipient,
            timestamp,
        };
        let signature = sender.sign(&payload.encode_to_vec()?);

        Ok(Self {
            root_hash: *root_hash,
            digest: digest.map(str::to_string),
            sender: sender_public,
            recipient: *recipient,
            timestamp,
            signature: hex::encode(signature.to_bytes()),
        })
    }

    /// Check the sender's signature over the record.
    pub fn verify(&self) -> Result<(), String> {
        let bytes = hex::decode(&self.signature).map_err(|e| e.to_string())?;
        let signature = Signature::from_slice(&bytes).map_err(|e| e.to_string())?;
        let payload = AnchorPayload {
            root_hash: &self.root_hash,
            digest: self.digest.as_deref(),
            sender: &self.sender,
            recipient: &self.recipient,
            timestamp: self.timestamp,
        };
        let message = payload.encode_to_vec().map_err(|e| e.to_string())?;
        self.sender
            .verify(&message, &signature)
            .map_err(|e| e.to_string())
    }

    pub fn transaction_ref(&self) -> Result<TransactionRef, LedgerError> {
        Ok(TransactionRef(ContentHash::of(&self.encode()?)))
    }
}

impl AnchorPayload<'_> {
    fn encode_to_vec(&self) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(self)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[async_trait]
pub trait Ledger: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Record `root_hash` (and its digest, if any) as sent from `sender`
    /// to `recipient`.
    async fn anchor(
        &self,
        root_hash: &ContentHash,
        digest: Option<&str>,
        sender: &SecretKey,
        recipient: &PublicKey,
    ) -> Result<TransactionRef, Self::Error>;

    /// Look up an anchored record. The returned record has passed
    /// signature verification.
    async fn resolve(&self, transaction: &TransactionRef) -> Result<AnchorRecord, Self::Error>;
}
