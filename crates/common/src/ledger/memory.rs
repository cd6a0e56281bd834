use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{AnchorRecord, Ledger, LedgerError, TransactionRef};
use crate::crypto::{PublicKey, SecretKey};
use crate::store::ContentHash;

/// In-memory ledger keyed by transaction reference
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<HashMap<TransactionRef, AnchorRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records anchored so far
    pub fn len(&self) -> usize {
        self.inner.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    type Error = LedgerError;

    async fn anchor(
        &self,
        root_hash: &ContentHash,
        digest: Option<&str>,
        sender: &SecretKey,
        recipient: &PublicKey,
    ) -> Result<TransactionRef, Self::Error> {
        let record = AnchorRecord::sign(root_hash, digest, sender, recipient)?;
        let transaction = record.transaction_ref()?;

        let mut inner = self.inner.write().map_err(|e| {
            LedgerError::Internal(format!("failed to acquire write lock: {}", e))
        })?;
        inner.insert(transaction, record);

        tracing::debug!("MemoryLedger::anchor {} -> {}", root_hash, transaction);
        Ok(transaction)
    }

    async fn resolve(&self, transaction: &TransactionRef) -> Result<AnchorRecord, Self::Error> {
        let record = {
            let inner = self.inner.read().map_err(|e| {
                LedgerError::Internal(format!("failed to acquire read lock: {}", e))
            })?;
            inner
                .get(transaction)
                .cloned()
                .ok_or(LedgerError::NotFound(*transaction))?
        };
        record
            .verify()
            .map_err(|e| LedgerError::Verification(*transaction, e))?;
        Ok(record)
    }
}
