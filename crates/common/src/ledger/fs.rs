use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{AnchorRecord, Ledger, LedgerError, TransactionRef};
use crate::crypto::{PublicKey, SecretKey};
use crate::store::ContentHash;

/// Ledger that keeps one JSON record per transaction in a directory
///
/// Records are named `<transaction>.json`. On resolve the record is
/// re-hashed, so a file edited after the fact no longer matches its name
/// and is reported as failing verification.
#[derive(Debug, Clone)]
pub struct FsLedger {
    dir: PathBuf,
}

impl FsLedger {
    pub async fn open(dir: &Path) -> Result<Self, LedgerError> {
        tokio::fs::create_dir_all(dir).await?;
        tracing::debug!("FsLedger::open at {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, transaction: &TransactionRef) -> PathBuf {
        self.dir.join(format!("{}.json", transaction))
    }
}

#[async_trait]
impl Ledger for FsLedger {
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

        let json = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(self.record_path(&transaction), json).await?;

        tracing::info!("anchored {} as transaction {}", root_hash, transaction);
        Ok(transaction)
    }

    async fn resolve(&self, transaction: &TransactionRef) -> Result<AnchorRecord, Self::Error> {
        let path = self.record_path(transaction);
        let json = match tokio::fs::read(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LedgerError::NotFound(*transaction));
            }
            Err(e) => return Err(e.into()),
        };
        let record: AnchorRecord = serde_json::from_slice(&json)?;

        if &record.transaction_ref()? != transaction {
            return Err(LedgerError::Verification(
                *transaction,
                "record does not hash to its transaction".to_string(),
            ));
        }
        record
            .verify()
            .map_err(|e| LedgerError::Verification(*transaction, e))?;
        Ok(record)
    }
}
