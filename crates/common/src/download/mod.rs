//! # Download
//!
//! [`Downloader`] reverses an upload. The root manifest is resolved,
//! fetched, checked against its digest, decrypted, and decoded before any
//! item is touched; a failure in any of those steps fails the download.
//!
//! Items are then fetched concurrently. A missing, corrupted, or
//! undecryptable item only fails its own [`DownloadedItem`], so a caller
//! asking for ten items still gets the nine that worked.

use std::sync::Arc;

use futures::StreamExt;

use crate::crypto::digest;
use crate::ledger::{Ledger, TransactionRef};
use crate::manifest::{ManifestEntry, ManifestError, RootManifest};
use crate::privacy::{PrivacyError, PrivacyStrategy};
use crate::store::{ContentHash, Store};
use crate::upload::DEFAULT_CONCURRENCY;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("ledger failed to resolve {transaction}: {source}")]
    Ledger {
        transaction: TransactionRef,
        #[source]
        source: BoxError,
    },
    #[error("store failed to fetch root {hash}: {source}")]
    Store {
        hash: ContentHash,
        #[source]
        source: BoxError,
    },
    #[error("root {hash} does not match digest {expected}")]
    DigestMismatch { hash: ContentHash, expected: String },
    #[error("failed to decrypt root {hash}: {source}")]
    Decryption {
        hash: ContentHash,
        #[source]
        source: PrivacyError,
    },
    #[error("root {hash} is not a valid manifest: {source}")]
    ManifestParse {
        hash: ContentHash,
        #[source]
        source: ManifestError,
    },
}

/// Why a single selected item could not be returned
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("{0} is not in the manifest")]
    NotInManifest(ItemSelector),
    #[error("store failed to fetch {hash}: {source}")]
    Store {
        hash: ContentHash,
        #[source]
        source: BoxError,
    },
    #[error("item {hash} does not match digest {expected}")]
    DigestMismatch { hash: ContentHash, expected: String },
    #[error("failed to decrypt {hash}: {source}")]
    Decryption {
        hash: ContentHash,
        #[source]
        source: PrivacyError,
    },
}

/// Where to find the root manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadTarget {
    Root(ContentHash),
    Transaction(TransactionRef),
}

/// Picks one manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSelector {
    /// Position in the manifest's data list
    Index(usize),
    /// Store hash of the entry's ciphertext
    DataHash(ContentHash),
}

impl std::fmt::Display for ItemSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemSelector::Index(index) => write!(f, "item #{}", index),
            ItemSelector::DataHash(hash) => write!(f, "item {}", hash),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadParams<'a> {
    target: DownloadTarget,
    strategy: &'a PrivacyStrategy,
    root_digest: Option<String>,
    selectors: Option<Vec<ItemSelector>>,
    concurrency: usize,
}

impl<'a> DownloadParams<'a> {
    pub fn new(target: DownloadTarget, strategy: &'a PrivacyStrategy) -> Self {
        Self {
            target,
            strategy,
            root_digest: None,
            selectors: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn root(hash: ContentHash, strategy: &'a PrivacyStrategy) -> Self {
        Self::new(DownloadTarget::Root(hash), strategy)
    }

    pub fn transaction(transaction: TransactionRef, strategy: &'a PrivacyStrategy) -> Self {
        Self::new(DownloadTarget::Transaction(transaction), strategy)
    }

    /// Require the fetched root to match this digest. Takes precedence
    /// over the digest anchored on the ledger.
    pub fn with_root_digest(mut self, digest: impl Into<String>) -> Self {
        self.root_digest = Some(digest.into());
        self
    }

    /// Return only these entries, in this order.
    pub fn select(mut self, selectors: impl IntoIterator<Item = ItemSelector>) -> Self {
        self.selectors = Some(selectors.into_iter().collect());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn target(&self) -> &DownloadTarget {
        &self.target
    }
}

#[derive(Debug)]
pub struct DownloadedItem {
    pub selector: ItemSelector,
    /// The manifest entry the selector matched, if any
    pub entry: Option<ManifestEntry>,
    pub data: Result<Vec<u8>, ItemError>,
}

#[derive(Debug)]
pub struct DownloadResult {
    /// Set when the download was resolved through the ledger
    pub transaction: Option<TransactionRef>,
    pub root_hash: ContentHash,
    /// The digest the root was checked against, if any
    pub root_digest: Option<String>,
    pub manifest: RootManifest,
    pub items: Vec<DownloadedItem>,
}

impl DownloadResult {
    /// Whether every requested item came back
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.data.is_ok())
    }
}

#[derive(Debug, Clone)]
pub struct Downloader<S: Store, L: Ledger> {
    store: S,
    ledger: L,
}

impl<S: Store, L: Ledger> Downloader<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self { store, ledger }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn download(&self, params: DownloadParams<'_>) -> Result<DownloadResult, DownloadError> {
        let strategy = Arc::new(params.strategy.clone());

        let (transaction, root_hash, anchored_digest) = match params.target {
            DownloadTarget::Root(hash) => (None, hash, None),
            DownloadTarget::Transaction(transaction) => {
                let record = self.ledger.resolve(&transaction).await.map_err(|e| {
                    DownloadError::Ledger {
                        transaction,
                        source: Box::new(e),
                    }
                })?;
                tracing::debug!("transaction {} resolved to root {}", transaction, record.root_hash);
                (Some(transaction), record.root_hash, record.digest)
            }
        };
        let root_digest = params.root_digest.clone().or(anchored_digest);

        let manifest = self
            .fetch_manifest(&root_hash, root_digest.as_deref(), strategy.clone())
            .await?;

        let selected: Vec<(ItemSelector, Option<ManifestEntry>)> = match &params.selectors {
            None => manifest
                .data()
                .iter()
                .enumerate()
                .map(|(index, entry)| (ItemSelector::Index(index), Some(entry.clone())))
                .collect(),
            Some(selectors) => selectors
                .iter()
                .map(|selector| (*selector, lookup(&manifest, selector).cloned()))
                .collect(),
        };

        let items: Vec<DownloadedItem> = futures::stream::iter(selected)
            .map(|(selector, entry)| {
                let strategy = strategy.clone();
                async move {
                    let data = match &entry {
                        Some(entry) => self.fetch_entry(entry, strategy).await,
                        None => Err(ItemError::NotInManifest(selector)),
                    };
                    if let Err(e) = &data {
                        tracing::warn!("{} failed: {}", selector, e);
                    }
                    DownloadedItem {
                        selector,
                        entry,
                        data,
                    }
                }
            })
            .buffered(params.concurrency)
            .collect()
            .await;

        tracing::info!(
            "downloaded {}/{} items from root {}",
            items.iter().filter(|item| item.data.is_ok()).count(),
            items.len(),
            root_hash
        );

        Ok(DownloadResult {
            transaction,
            root_hash,
            root_digest,
            manifest,
            items,
        })
    }

    /// Fetch, verify, and decrypt a single manifest entry.
    pub async fn download_entry(
        &self,
        entry: &ManifestEntry,
        strategy: &PrivacyStrategy,
    ) -> Result<Vec<u8>, ItemError> {
        self.fetch_entry(entry, Arc::new(strategy.clone())).await
    }

    async fn fetch_entry(
        &self,
        entry: &ManifestEntry,
        strategy: Arc<PrivacyStrategy>,
    ) -> Result<Vec<u8>, ItemError> {
        let hash = entry.data_hash;
        let bytes = self
            .store
            .get(&hash)
            .await
            .map_err(|e| ItemError::Store {
                hash,
                source: Box::new(e),
            })?;

        if let Some(expected) = &entry.digest {
            if !digest::validate(&bytes, expected) {
                return Err(ItemError::DigestMismatch {
                    hash,
                    expected: expected.clone(),
                });
            }
        }

        strategy
            .decrypt_blocking(bytes)
            .await
            .map_err(|source| ItemError::Decryption { hash, source })
    }

    async fn fetch_manifest(
        &self,
        root_hash: &ContentHash,
        expected_digest: Option<&str>,
        strategy: Arc<PrivacyStrategy>,
    ) -> Result<RootManifest, DownloadError> {
        let hash = *root_hash;
        let bytes = self
            .store
            .get(&hash)
            .await
            .map_err(|e| DownloadError::Store {
                hash,
                source: Box::new(e),
            })?;

        if let Some(expected) = expected_digest {
            if !digest::validate(&bytes, expected) {
                return Err(DownloadError::DigestMismatch {
                    hash,
                    expected: expected.to_string(),
                });
            }
        }

        let decrypted = strategy
            .clone()
            .decrypt_blocking(bytes)
            .await
            .map_err(|source| DownloadError::Decryption { hash, source })?;
        let manifest = RootManifest::from_bytes(&decrypted)
            .map_err(|source| DownloadError::ManifestParse { hash, source })?;

        if manifest.privacy_type() != strategy.privacy_type() {
            tracing::warn!(
                "root {} was uploaded with {} privacy but read with {}",
                hash,
                manifest.privacy_type(),
                strategy.privacy_type()
            );
        }
        Ok(manifest)
    }
}

fn lookup<'m>(manifest: &'m RootManifest, selector: &ItemSelector) -> Option<&'m ManifestEntry> {
    match selector {
        ItemSelector::Index(index) => manifest.entry(*index),
        ItemSelector::DataHash(hash) => manifest.find_by_hash(hash),
    }
}
