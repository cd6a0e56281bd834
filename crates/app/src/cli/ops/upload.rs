use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use common::crypto::PublicKey;
use common::manifest::StoreType;
use common::upload::{DataItem, UploadError, UploadParams, Uploader};

use crate::cli::strategy::{StrategyError, UploadPrivacyArgs};
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Files to upload, one item each
    pub files: Vec<PathBuf>,

    /// Inline text to upload as an item (repeatable)
    #[arg(long = "text", value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Description recorded in the root manifest
    #[arg(long)]
    pub description: Option<String>,

    /// Public key (hex) the upload is anchored to. Defaults to the
    /// --shared-with key, then to our own key.
    #[arg(long, value_name = "PUBLIC_KEY")]
    pub recipient: Option<String>,

    #[command(flatten)]
    pub privacy: UploadPrivacyArgs,

    /// Skip digests of stored ciphertext
    #[arg(long)]
    pub no_digest: bool,

    /// Store type hint (inline or block); defaults to the configured one
    #[arg(long)]
    pub store_type: Option<StoreType>,

    /// Items pushed at once; defaults to the configured value
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadOpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("invalid recipient: {0}")]
    Recipient(String),
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = UploadOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let key = state.load_key()?;

        let recipient = match &self.recipient {
            Some(hex) => {
                PublicKey::from_hex(hex).map_err(|e| UploadOpError::Recipient(e.to_string()))?
            }
            None => self.privacy.counterpart()?.unwrap_or_else(|| key.public()),
        };
        let prepared = self.privacy.build(&key)?;

        let items = self
            .files
            .iter()
            .map(DataItem::from_file)
            .chain(self.texts.iter().cloned().map(DataItem::from_text));

        let mut builder = UploadParams::builder(&key, recipient)
            .items(items)
            .strategy(&prepared.strategy)
            .compute_digest(state.config.compute_digest && !self.no_digest)
            .store_type(self.store_type.unwrap_or(state.config.store_type))
            .concurrency(self.concurrency.unwrap_or(state.config.concurrency));
        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }
        let params = builder.build()?;
        // shares go out only once the upload is known to be valid
        prepared.persist_shares()?;

        let uploader = Uploader::new(state.open_store().await?, state.open_ledger().await?);
        let result = uploader.upload(params).await?;

        let mut output = format!(
            "transaction: {}\nroot: {}\nprivacy: {}\n",
            result.transaction,
            result.root_hash,
            result.manifest.privacy_type()
        );
        if let Some(digest) = &result.root_digest {
            writeln!(output, "root digest: {}", digest).ok();
        }
        for (index, entry) in result.manifest.data().iter().enumerate() {
            writeln!(
                output,
                "  [{}] {} {}",
                index,
                entry.data_hash,
                entry.name.as_deref().unwrap_or("-")
            ).ok();
        }
        Ok(output.trim_end().to_string())
    }
}
