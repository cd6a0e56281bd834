//! Shared fixtures for the upload/download integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use common::crypto::SecretKey;
use common::download::Downloader;
use common::ledger::MemoryLedger;
use common::privacy::{KdfParams, PasswordStrategy, PrivacyStrategy, Scheme};
use common::store::{BlobsStore, BlobsStoreError, ContentHash, Store};
use common::upload::Uploader;

pub const PASSWORD: &str = "this passphrase is long enough to satisfy the fifty character minimum";

/// Password strategy with KDF costs low enough for debug-build tests
pub fn password_strategy(password: &str) -> PrivacyStrategy {
    let strategy = PasswordStrategy::new(password)
        .unwrap()
        .with_kdf_params(KdfParams::new(64, 1, 1).unwrap());
    Scheme::Password(strategy).into()
}

/// In-memory blobs store that counts calls and can serve tampered bytes
#[derive(Debug, Clone)]
pub struct TestStore {
    inner: BlobsStore,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
    overrides: Arc<Mutex<HashMap<ContentHash, Bytes>>>,
}

impl TestStore {
    pub async fn new() -> Self {
        Self {
            inner: BlobsStore::memory().await.unwrap(),
            puts: Arc::new(AtomicUsize::new(0)),
            gets: Arc::new(AtomicUsize::new(0)),
            overrides: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Serve `data` for `hash` from now on, as a misbehaving store would
    pub fn tamper(&self, hash: ContentHash, data: impl Into<Bytes>) {
        self.overrides.lock().unwrap().insert(hash, data.into());
    }

    /// Flip one byte of whatever is stored under `hash`
    pub async fn corrupt(&self, hash: ContentHash) {
        let mut data = self.inner.get(&hash).await.unwrap().to_vec();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        self.tamper(hash, data);
    }
}

#[async_trait]
impl Store for TestStore {
    type Error = BlobsStoreError;

    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, Self::Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(data).await
    }

    async fn get(&self, hash: &ContentHash) -> Result<Bytes, Self::Error> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let tampered = self.overrides.lock().unwrap().get(hash).cloned();
        match tampered {
            Some(data) => Ok(data),
            None => self.inner.get(hash).await,
        }
    }
}

pub struct Env {
    pub store: TestStore,
    pub ledger: MemoryLedger,
    pub uploader: Uploader<TestStore, MemoryLedger>,
    pub downloader: Downloader<TestStore, MemoryLedger>,
    pub sender: SecretKey,
    pub recipient: SecretKey,
}

pub async fn setup() -> Env {
    let store = TestStore::new().await;
    let ledger = MemoryLedger::new();
    Env {
        uploader: Uploader::new(store.clone(), ledger.clone()),
        downloader: Downloader::new(store.clone(), ledger.clone()),
        store,
        ledger,
        sender: SecretKey::generate().unwrap(),
        recipient: SecretKey::generate().unwrap(),
    }
}
