pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealbox")]
#[command(about = "Encrypt, store and anchor bundles of data")]
pub struct Args {
    /// Path to the sealbox config directory (defaults to ~/.sealbox)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level (overrides the configured level; RUST_LOG overrides both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
