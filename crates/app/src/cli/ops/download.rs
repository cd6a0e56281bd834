use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::Args;
use common::download::{
    DownloadError, DownloadParams, DownloadTarget, DownloadedItem, Downloader, ItemSelector,
};
use common::ledger::TransactionRef;
use common::store::ContentHash;

use crate::cli::strategy::{DownloadPrivacyArgs, StrategyError};
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Download {
    /// Root manifest hash to download
    #[arg(long, conflicts_with = "transaction", required_unless_present = "transaction")]
    pub root: Option<ContentHash>,

    /// Ledger transaction to resolve and download
    #[arg(long)]
    pub transaction: Option<TransactionRef>,

    /// Expected root digest (defaults to the anchored one)
    #[arg(long)]
    pub digest: Option<String>,

    /// Only fetch the item at this manifest position (repeatable)
    #[arg(long = "index", value_name = "N")]
    pub indices: Vec<usize>,

    /// Only fetch the item stored under this hash (repeatable)
    #[arg(long = "hash", value_name = "HASH")]
    pub hashes: Vec<ContentHash>,

    /// Directory to write fetched items into
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub privacy: DownloadPrivacyArgs,

    /// Items fetched at once; defaults to the configured value
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadOpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("one of --root or --transaction is required")]
    MissingTarget,
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

impl Download {
    fn target(&self) -> Result<DownloadTarget, DownloadOpError> {
        match (self.root, self.transaction) {
            (_, Some(transaction)) => Ok(DownloadTarget::Transaction(transaction)),
            (Some(root), None) => Ok(DownloadTarget::Root(root)),
            (None, None) => Err(DownloadOpError::MissingTarget),
        }
    }

    fn selectors(&self) -> Option<Vec<ItemSelector>> {
        if self.indices.is_empty() && self.hashes.is_empty() {
            return None;
        }
        Some(
            self.indices
                .iter()
                .map(|index| ItemSelector::Index(*index))
                .chain(self.hashes.iter().map(|hash| ItemSelector::DataHash(*hash)))
                .collect(),
        )
    }
}

/// File name for a fetched item: its recorded name when that is a plain
/// file name, otherwise its content hash.
fn file_name(item: &DownloadedItem) -> Option<String> {
    let entry = item.entry.as_ref()?;
    let name = entry
        .name
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned());
    Some(name.unwrap_or_else(|| entry.data_hash.to_hex()))
}

/// Hands out output file names, never the same one twice in a download
#[derive(Debug, Default)]
struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    /// The item's file name, or `stem-N.ext` when an earlier item took it.
    fn claim(&mut self, item: &DownloadedItem) -> String {
        let name = file_name(item).unwrap_or_else(|| item.selector.to_string());
        if self.used.insert(name.clone()) {
            return name;
        }
        let path = Path::new(&name);
        let (stem, extension) = match (path.file_stem(), path.extension()) {
            (Some(stem), Some(ext)) => (
                stem.to_string_lossy().into_owned(),
                format!(".{}", ext.to_string_lossy()),
            ),
            _ => (name.clone(), String::new()),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}{}", stem, n, extension);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Download {
    type Error = DownloadOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let key = state.load_key()?;
        let strategy = self.privacy.build(&key)?;

        let mut params = DownloadParams::new(self.target()?, &strategy)
            .with_concurrency(self.concurrency.unwrap_or(state.config.concurrency));
        if let Some(digest) = &self.digest {
            params = params.with_root_digest(digest.clone());
        }
        if let Some(selectors) = self.selectors() {
            params = params.select(selectors);
        }

        let downloader = Downloader::new(state.open_store().await?, state.open_ledger().await?);
        let result = downloader.download(params).await?;

        if let Some(dir) = &self.output {
            std::fs::create_dir_all(dir).map_err(|e| DownloadOpError::Write(dir.clone(), e))?;
        }

        let mut output = format!(
            "root: {}\nprivacy: {}\n",
            result.root_hash,
            result.manifest.privacy_type()
        );
        if let Some(description) = result.manifest.description() {
            writeln!(output, "description: {}", description).ok();
        }
        let mut names = OutputNames::default();
        for item in &result.items {
            match &item.data {
                Ok(data) => {
                    let name = names.claim(item);
                    match &self.output {
                        Some(dir) => {
                            let path = dir.join(&name);
                            std::fs::write(&path, data)
                                .map_err(|e| DownloadOpError::Write(path.clone(), e))?;
                            writeln!(output, "  {} -> {}", item.selector, path.display()).ok();
                        }
                        None => {
                            writeln!(
                                output,
                                "  {} {} ({} bytes)",
                                item.selector,
                                name,
                                data.len()
                            ).ok();
                        }
                    }
                }
                Err(e) => {
                    writeln!(output, "  {} FAILED: {}", item.selector, e).ok();
                }
            }
        }
        Ok(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::manifest::ManifestEntry;

    fn item(name: Option<&str>) -> DownloadedItem {
        item_at(0, name)
    }

    fn item_at(index: usize, name: Option<&str>) -> DownloadedItem {
        DownloadedItem {
            selector: ItemSelector::Index(index),
            entry: Some(ManifestEntry {
                digest: None,
                data_hash: ContentHash::of(b"x"),
                description: None,
                metadata: None,
                timestamp: 0,
                name: name.map(str::to_string),
                content_type: None,
            }),
            data: Ok(vec![]),
        }
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name(&item(Some("../../etc/passwd"))).as_deref(), Some("passwd"));
        assert_eq!(file_name(&item(Some("notes.txt"))).as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_file_name_falls_back_to_hash() {
        assert_eq!(
            file_name(&item(None)),
            Some(ContentHash::of(b"x").to_hex())
        );
    }

    #[test]
    fn test_same_named_items_get_distinct_files() {
        let mut names = OutputNames::default();
        let claimed: Vec<String> = [
            item_at(0, Some("a/report.txt")),
            item_at(1, Some("b/report.txt")),
            item_at(2, Some("report.txt")),
            item_at(3, Some("README")),
            item_at(4, Some("README")),
        ]
        .iter()
        .map(|item| names.claim(item))
        .collect();
        assert_eq!(
            claimed,
            ["report.txt", "report-1.txt", "report-2.txt", "README", "README-1"]
        );
    }

    #[test]
    fn test_numbered_name_does_not_shadow_a_real_one() {
        let mut names = OutputNames::default();
        assert_eq!(names.claim(&item_at(0, Some("report-1.txt"))), "report-1.txt");
        assert_eq!(names.claim(&item_at(1, Some("report.txt"))), "report.txt");
        assert_eq!(names.claim(&item_at(2, Some("report.txt"))), "report-2.txt");
    }
}
