use clap::Args;
use common::manifest::StoreType;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Items pushed or fetched at once
    #[arg(long, default_value_t = common::upload::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Skip digests of stored ciphertext on upload
    #[arg(long)]
    pub no_digest: bool,

    /// Store type hint written into manifests (inline or block)
    #[arg(long, default_value = "block")]
    pub store_type: StoreType,

    /// Default log level
    #[arg(long, default_value = "warn")]
    pub default_log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            concurrency: self.concurrency.max(1),
            compute_digest: !self.no_digest,
            store_type: self.store_type,
            log_level: self.default_log_level.clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let key = state.load_key()?;

        let output = format!(
            "Initialized sealbox directory at: {}\n\
             - Key: {}\n\
             - Public key: {}\n\
             - Blobs: {}\n\
             - Ledger: {}\n\
             - Config: {}",
            state.sealbox_dir.display(),
            state.key_path.display(),
            key.public(),
            state.blobs_path.display(),
            state.ledger_path.display(),
            state.config_path.display(),
        );

        Ok(output)
    }
}
