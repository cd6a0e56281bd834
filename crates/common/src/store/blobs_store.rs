use std::future::IntoFuture;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use iroh_blobs::{
    api::{
        blobs::{BlobStatus, Blobs},
        RequestError,
    },
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

use super::{ContentHash, Store};

/// Store backed by a local iroh-blobs store, in memory or on disk
///
/// iroh-blobs addresses blobs by BLAKE3, so the hash it hands back is
/// exactly the [`ContentHash`] of the stored bytes.
#[derive(Clone, Debug)]
pub struct BlobsStore {
    pub inner: Arc<BlobsProtocol>,
}

impl Deref for BlobsStore {
    type Target = Arc<BlobsProtocol>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobsStoreError {
    #[error("blobs store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("blob store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
    #[error("blob not found: {0}")]
    NotFound(ContentHash),
}

impl BlobsStore {
    /// Load a blob store from the given path
    pub async fn fs(path: &Path) -> Result<Self, BlobsStoreError> {
        tracing::debug!("BlobsStore::fs called with path: {:?}", path);
        let store = FsStore::load(path).await?;
        tracing::debug!("BlobsStore::fs completed loading FsStore");
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Load a memory blobs store
    pub async fn memory() -> Result<Self, BlobsStoreError> {
        let store = MemStore::new();
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Get a handle to the underlying blobs client against
    ///  the store
    pub fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    /// Whether a complete blob is held for the hash
    pub async fn stat(&self, hash: &ContentHash) -> Result<bool, BlobsStoreError> {
        let stat = self
            .blobs()
            .status(Hash::from_bytes(*hash.as_bytes()))
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(matches!(stat, BlobStatus::Complete { .. }))
    }
}

#[async_trait]
impl Store for BlobsStore {
    type Error = BlobsStoreError;

    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, Self::Error> {
        let len = data.len();
        let hash = self.blobs().add_bytes(data).into_future().await?.hash;
        let hash = ContentHash::from_bytes(*hash.as_bytes());
        tracing::debug!("BlobsStore::put stored {} bytes as {}", len, hash);
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Bytes, Self::Error> {
        // get_bytes on a missing blob surfaces as an opaque export error
        if !self.stat(hash).await? {
            return Err(BlobsStoreError::NotFound(*hash));
        }
        let bytes = self
            .blobs()
            .get_bytes(Hash::from_bytes(*hash.as_bytes()))
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_memory() {
        let store = BlobsStore::memory().await.unwrap();
        let hash = store.put(b"hello blobs".to_vec()).await.unwrap();
        assert_eq!(hash, ContentHash::of(b"hello blobs"));
        assert!(store.stat(&hash).await.unwrap());
        assert_eq!(store.get(&hash).await.unwrap().as_ref(), b"hello blobs");
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let store = BlobsStore::memory().await.unwrap();
        let missing = ContentHash::of(b"never stored");
        assert!(!store.stat(&missing).await.unwrap());
        assert!(matches!(
            store.get(&missing).await,
            Err(BlobsStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_store_persists() {
        let dir = TempDir::new().unwrap();
        let store = BlobsStore::fs(dir.path()).await.unwrap();
        let hash = store.put(vec![7u8; 4096]).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap().len(), 4096);
    }
}
