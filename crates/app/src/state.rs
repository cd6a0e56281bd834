use std::{fs, path::PathBuf};

use common::ledger::{FsLedger, LedgerError};
use common::manifest::StoreType;
use common::prelude::SecretKey;
use common::store::{BlobsStore, BlobsStoreError};
use common::upload::DEFAULT_CONCURRENCY;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "sealbox";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";
pub const BLOBS_DIR_NAME: &str = "blobs";
pub const LEDGER_DIR_NAME: &str = "ledger";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Items pushed or fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Record digests of stored ciphertext in uploads
    #[serde(default = "default_compute_digest")]
    pub compute_digest: bool,
    /// Store type hint written into new manifests
    #[serde(default)]
    pub store_type: StoreType,
    /// Default log level when RUST_LOG and --log-level are unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_compute_digest() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            compute_digest: default_compute_digest(),
            store_type: StoreType::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the sealbox directory (~/.sealbox)
    pub sealbox_dir: PathBuf,
    /// Path to the identity key PEM file
    pub key_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the ledger directory
    pub ledger_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the sealbox directory path (custom or default ~/.sealbox)
    pub fn sealbox_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new sealbox state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let sealbox_dir = Self::sealbox_dir(custom_path)?;

        if sealbox_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&sealbox_dir)?;

        let blobs_path = sealbox_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;
        let ledger_path = sealbox_dir.join(LEDGER_DIR_NAME);
        fs::create_dir_all(&ledger_path)?;

        let key = SecretKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = sealbox_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;

        let config = config.unwrap_or_default();
        let config_path = sealbox_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            sealbox_dir,
            key_path,
            blobs_path,
            ledger_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the sealbox directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let sealbox_dir = Self::sealbox_dir(custom_path)?;

        if !sealbox_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = sealbox_dir.join(KEY_FILE_NAME);
        let blobs_path = sealbox_dir.join(BLOBS_DIR_NAME);
        let ledger_path = sealbox_dir.join(LEDGER_DIR_NAME);
        let config_path = sealbox_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !ledger_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", LEDGER_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            sealbox_dir,
            key_path,
            blobs_path,
            ledger_path,
            config_path,
            config,
        })
    }

    /// Load the secret key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }

    pub async fn open_store(&self) -> Result<BlobsStore, StateError> {
        Ok(BlobsStore::fs(&self.blobs_path).await?)
    }

    pub async fn open_ledger(&self) -> Result<FsLedger, StateError> {
        Ok(FsLedger::open(&self.ledger_path).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sealbox directory not initialized. Run 'sealbox init' first")]
    NotInitialized,

    #[error("sealbox directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("blob store error: {0}")]
    Store(#[from] BlobsStoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
