//! Privacy flags shared by `upload` and `download`, and the share file
//! format threshold uploads hand out.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use common::crypto::{KeyError, PublicKey, SecretKey, ShareMap};
use common::privacy::{PrivacyError, PrivacyStrategy, ThresholdSharedStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error(transparent)]
    Privacy(#[from] PrivacyError),
    #[error("invalid public key: {0}")]
    Key(#[from] KeyError),
    #[error("share file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("share file is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("share {0} is not valid hex")]
    ShareHex(u8),
    #[error("share file {0} already exists")]
    ShareFileExists(PathBuf),
}

/// Privacy selection for an upload. Plain when nothing is given.
#[derive(Args, Debug, Clone, Default)]
pub struct UploadPrivacyArgs {
    /// Encrypt with a password of at least 50 characters
    #[arg(long, conflicts_with_all = ["shared_with", "threshold"])]
    pub password: Option<String>,

    /// Encrypt with a key agreed with this public key (hex)
    #[arg(long, value_name = "PUBLIC_KEY", conflicts_with = "threshold")]
    pub shared_with: Option<String>,

    /// Encrypt under a fresh key split into shares; this many rebuild it
    #[arg(long, requires_all = ["parts", "shares_out"])]
    pub threshold: Option<usize>,

    /// Number of shares to split the key into
    #[arg(long, requires = "threshold")]
    pub parts: Option<usize>,

    /// Where to write the generated shares
    #[arg(long, value_name = "FILE", requires = "threshold")]
    pub shares_out: Option<PathBuf>,

    /// Free-text tag recorded in the manifest
    #[arg(long)]
    pub search_tag: Option<String>,
}

impl UploadPrivacyArgs {
    /// The counterpart key, if shared-key encryption was asked for
    pub fn counterpart(&self) -> Result<Option<PublicKey>, StrategyError> {
        Ok(self
            .shared_with
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()?)
    }

    /// Build the strategy. Generated threshold shares are held in the
    /// result until [`PreparedStrategy::persist_shares`] writes them.
    pub fn build(&self, own: &SecretKey) -> Result<PreparedStrategy, StrategyError> {
        let mut pending_shares = None;
        let strategy = if let Some(password) = &self.password {
            PrivacyStrategy::password(password.clone())?
        } else if let Some(counterpart) = self.counterpart()? {
            PrivacyStrategy::shared_key(own, &counterpart)?
        } else if let (Some(threshold), Some(parts), Some(out)) =
            (self.threshold, self.parts, &self.shares_out)
        {
            let (strategy, shares) = ThresholdSharedStrategy::generate(parts, threshold)?;
            pending_shares = Some((out.clone(), ShareFile::new(parts, threshold, &shares)));
            common::privacy::Scheme::ThresholdShared(strategy).into()
        } else {
            PrivacyStrategy::plain()
        };

        let strategy = match &self.search_tag {
            Some(tag) => strategy.with_search_tag(tag.clone()),
            None => strategy,
        };
        Ok(PreparedStrategy {
            strategy,
            pending_shares,
        })
    }
}

/// An upload strategy plus any shares it still has to hand out
#[derive(Debug)]
pub struct PreparedStrategy {
    pub strategy: PrivacyStrategy,
    pending_shares: Option<(PathBuf, ShareFile)>,
}

impl PreparedStrategy {
    /// Write generated shares to their file. An existing file is never
    /// replaced, since it may hold the only shares of an earlier upload.
    pub fn persist_shares(&self) -> Result<(), StrategyError> {
        if let Some((path, file)) = &self.pending_shares {
            file.write(path)?;
            tracing::info!("wrote {} shares to {:?}", file.shares.len(), path);
        }
        Ok(())
    }
}

/// Privacy selection for a download. Must match what the upload used.
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadPrivacyArgs {
    /// Decrypt with the upload's password
    #[arg(long, conflicts_with_all = ["shared_with", "shares"])]
    pub password: Option<String>,

    /// Decrypt with the key agreed with this public key (hex)
    #[arg(long, value_name = "PUBLIC_KEY", conflicts_with = "shares")]
    pub shared_with: Option<String>,

    /// Decrypt with the shares held in this file
    #[arg(long, value_name = "FILE")]
    pub shares: Option<PathBuf>,
}

impl DownloadPrivacyArgs {
    pub fn build(&self, own: &SecretKey) -> Result<PrivacyStrategy, StrategyError> {
        if let Some(password) = &self.password {
            return Ok(PrivacyStrategy::password(password.clone())?);
        }
        if let Some(counterpart) = &self.shared_with {
            let counterpart = PublicKey::from_hex(counterpart)?;
            return Ok(PrivacyStrategy::shared_key(own, &counterpart)?);
        }
        if let Some(path) = &self.shares {
            return ShareFile::read(path)?.into_strategy();
        }
        Ok(PrivacyStrategy::plain())
    }
}

/// JSON file holding threshold shares as hex, keyed by share index
///
/// Hand each holder a copy with only their own entries; any `threshold`
/// entries merged into one file decrypt the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFile {
    pub total_parts: usize,
    pub threshold: usize,
    pub shares: BTreeMap<u8, String>,
}

impl ShareFile {
    pub fn new(total_parts: usize, threshold: usize, shares: &ShareMap) -> Self {
        Self {
            total_parts,
            threshold,
            shares: shares
                .iter()
                .map(|(index, share)| (*index, hex::encode(share)))
                .collect(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, StrategyError> {
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }

    /// Create `path` and write the shares into it. Fails if it exists.
    pub fn write(&self, path: &Path) -> Result<(), StrategyError> {
        let contents = serde_json::to_vec_pretty(self)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StrategyError::ShareFileExists(path.to_path_buf()),
                _ => StrategyError::Io(e),
            })?;
        file.write_all(&contents)?;
        Ok(())
    }

    pub fn share_map(&self) -> Result<ShareMap, StrategyError> {
        self.shares
            .iter()
            .map(|(index, share)| {
                hex::decode(share)
                    .map(|bytes| (*index, bytes))
                    .map_err(|_| StrategyError::ShareHex(*index))
            })
            .collect()
    }

    pub fn into_strategy(self) -> Result<PrivacyStrategy, StrategyError> {
        let shares = self.share_map()?;
        Ok(PrivacyStrategy::threshold_shared(
            self.total_parts,
            self.threshold,
            shares,
        )?)
    }
}
