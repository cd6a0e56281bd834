//! # Upload
//!
//! [`Uploader`] turns a list of [`DataItem`]s into one anchored upload:
//!
//! 1. each item is read, encrypted with the caller's strategy, optionally
//!    digested, and put into the store (concurrently, order preserved)
//! 2. a [`RootManifest`] listing every entry is encoded, encrypted with the
//!    same strategy, optionally digested, and put into the store
//! 3. the root hash and digest are anchored on the ledger
//!
//! Any failure aborts the upload. Items already written stay in the store
//! unreferenced; no manifest is written unless every item made it.

mod item;

use std::borrow::Cow;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};

use crate::crypto::{digest, PublicKey, SecretKey};
use crate::ledger::{Ledger, TransactionRef};
use crate::manifest::{ManifestEntry, ManifestError, RootManifest, StoreType};
use crate::privacy::{PrivacyError, PrivacyStrategy};
use crate::store::{ContentHash, Store};

pub use item::{
    DataItem, DataItemError, DataSource, MAX_DESCRIPTION_LENGTH, RESERVED_CONTENT_TYPES,
};

/// Items pushed to the store at once unless the caller says otherwise
pub const DEFAULT_CONCURRENCY: usize = 4;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    Validation(String),
    #[error("failed to read item {index}: {source}")]
    Read {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encrypt {}: {source}", .index.map_or("root manifest".to_string(), |i| format!("item {}", i)))]
    Encryption {
        index: Option<usize>,
        #[source]
        source: PrivacyError,
    },
    #[error("store failed while {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("ledger failed to anchor upload: {0}")]
    Ledger(#[source] BoxError),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

impl From<DataItemError> for UploadError {
    fn from(err: DataItemError) -> Self {
        UploadError::Validation(err.to_string())
    }
}

/// Everything one upload needs
///
/// The sender key and a caller-supplied strategy are borrowed for the
/// duration of the upload and never kept. Without a strategy the upload
/// is plain.
#[derive(Debug)]
pub struct UploadParams<'a> {
    sender: &'a SecretKey,
    recipient: PublicKey,
    items: Vec<DataItem>,
    strategy: Cow<'a, PrivacyStrategy>,
    compute_digest: bool,
    store_type: StoreType,
    description: Option<String>,
    concurrency: usize,
}

impl<'a> UploadParams<'a> {
    pub fn builder(sender: &'a SecretKey, recipient: PublicKey) -> UploadParamsBuilder<'a> {
        UploadParamsBuilder {
            params: UploadParams {
                sender,
                recipient,
                items: Vec::new(),
                strategy: Cow::Owned(PrivacyStrategy::plain()),
                compute_digest: true,
                store_type: StoreType::default(),
                description: None,
                concurrency: DEFAULT_CONCURRENCY,
            },
        }
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    pub fn strategy(&self) -> &PrivacyStrategy {
        &self.strategy
    }

    fn validate(&self) -> Result<(), UploadError> {
        if self.items.is_empty() {
            return Err(UploadError::Validation(
                "at least one data item is required".to_string(),
            ));
        }
        if let Some(description) = &self.description {
            item::check_description(description)?;
        }
        if self.concurrency == 0 {
            return Err(UploadError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UploadParamsBuilder<'a> {
    params: UploadParams<'a>,
}

impl<'a> UploadParamsBuilder<'a> {
    pub fn item(mut self, item: DataItem) -> Self {
        self.params.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = DataItem>) -> Self {
        self.params.items.extend(items);
        self
    }

    pub fn strategy(mut self, strategy: &'a PrivacyStrategy) -> Self {
        self.params.strategy = Cow::Borrowed(strategy);
        self
    }

    pub fn compute_digest(mut self, compute_digest: bool) -> Self {
        self.params.compute_digest = compute_digest;
        self
    }

    pub fn store_type(mut self, store_type: StoreType) -> Self {
        self.params.store_type = store_type;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.params.description = Some(description.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.params.concurrency = concurrency;
        self
    }

    pub fn build(self) -> Result<UploadParams<'a>, UploadError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// What a finished upload hands back
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub transaction: TransactionRef,
    pub root_hash: ContentHash,
    pub root_digest: Option<String>,
    pub manifest: RootManifest,
}

#[derive(Debug, Clone)]
pub struct Uploader<S: Store, L: Ledger> {
    store: S,
    ledger: L,
}

impl<S: Store, L: Ledger> Uploader<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self { store, ledger }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn upload(&self, params: UploadParams<'_>) -> Result<UploadResult, UploadError> {
        params.validate()?;
        let strategy = Arc::new(PrivacyStrategy::clone(&params.strategy));

        tracing::debug!(
            "uploading {} items with {} privacy",
            params.items.len(),
            strategy.privacy_type()
        );

        let pushes: Vec<_> = params
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.push_item(index, item, strategy.clone(), params.compute_digest)
            })
            .collect();
        let entries: Vec<ManifestEntry> = futures::stream::iter(pushes)
            .buffered(params.concurrency)
            .try_collect()
            .await?;

        let manifest = RootManifest::new(
            strategy.privacy_type(),
            strategy.search_tag().map(str::to_string),
            params.store_type,
            params.description.clone(),
            entries,
        )?;

        let encoded = manifest.to_bytes()?;
        let encrypted = strategy
            .encrypt_blocking(encoded)
            .await
            .map_err(|source| UploadError::Encryption {
                index: None,
                source,
            })?;
        let root_digest = params.compute_digest.then(|| digest::digest(&encrypted));

        let root_hash = self
            .store
            .put(encrypted)
            .await
            .map_err(|e| UploadError::Store {
                context: "storing root manifest".to_string(),
                source: Box::new(e),
            })?;

        let transaction = self
            .ledger
            .anchor(
                &root_hash,
                root_digest.as_deref(),
                params.sender,
                &params.recipient,
            )
            .await
            .map_err(|e| {
                tracing::warn!("root {} stored but not anchored: {}", root_hash, e);
                UploadError::Ledger(Box::new(e))
            })?;

        tracing::info!(
            "uploaded {} items, root {} anchored as {}",
            manifest.data().len(),
            root_hash,
            transaction
        );

        Ok(UploadResult {
            transaction,
            root_hash,
            root_digest,
            manifest,
        })
    }

    async fn push_item(
        &self,
        index: usize,
        item: &DataItem,
        strategy: Arc<PrivacyStrategy>,
        compute_digest: bool,
    ) -> Result<ManifestEntry, UploadError> {
        let data = item
            .read()
            .await
            .map_err(|source| UploadError::Read { index, source })?;
        let encrypted = strategy
            .encrypt_blocking(data)
            .await
            .map_err(|source| UploadError::Encryption {
                index: Some(index),
                source,
            })?;
        let digest = compute_digest.then(|| digest::digest(&encrypted));

        let data_hash = self
            .store
            .put(encrypted)
            .await
            .map_err(|e| UploadError::Store {
                context: format!("storing item {}", index),
                source: Box::new(e),
            })?;
        tracing::debug!("item {} stored as {}", index, data_hash);

        Ok(ManifestEntry {
            digest,
            data_hash,
            description: item.description().map(str::to_string),
            metadata: item.metadata().cloned(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            name: item.name().map(str::to_string),
            content_type: item.content_type().map(str::to_string),
        })
    }
}
