use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Longest description accepted on an item or an upload, in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Content types the storage layer keeps for its own objects
pub const RESERVED_CONTENT_TYPES: &[&str] = &["ipfs/directory", "ipfs/path"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataItemError {
    #[error("description is {length} characters, limit is {limit}")]
    DescriptionTooLong { length: usize, limit: usize },
    #[error("content type {0} is reserved")]
    ReservedContentType(String),
    #[error("metadata is already attached")]
    MetadataAlreadySet,
}

/// Where an item's bytes come from
#[derive(Debug, Clone)]
pub enum DataSource {
    Bytes(Vec<u8>),
    Text(String),
    /// Read when the upload reaches this item, not before
    File(PathBuf),
}

/// One piece of data to upload, with the descriptive fields that end up
/// in its manifest entry
#[derive(Debug, Clone)]
pub struct DataItem {
    source: DataSource,
    description: Option<String>,
    name: Option<String>,
    content_type: Option<String>,
    metadata: Option<BTreeMap<String, String>>,
}

impl DataItem {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            description: None,
            name: None,
            content_type: None,
            metadata: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(DataSource::Bytes(bytes.into()))
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut item = Self::new(DataSource::Text(text.into()));
        item.content_type = Some("text/plain".to_string());
        item
    }

    /// An item backed by a file. Name and content type are guessed from
    /// the path and can be overridden.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut item = Self::new(DataSource::File(path.to_path_buf()));
        item.name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        item.content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        item
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Result<Self, DataItemError> {
        let description = description.into();
        check_description(&description)?;
        self.description = Some(description);
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Result<Self, DataItemError> {
        let content_type = content_type.into();
        if RESERVED_CONTENT_TYPES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(content_type.trim()))
        {
            return Err(DataItemError::ReservedContentType(content_type));
        }
        self.content_type = Some(content_type);
        Ok(self)
    }

    /// Attach metadata. It cannot be replaced once attached.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Result<Self, DataItemError> {
        if self.metadata.is_some() {
            return Err(DataItemError::MetadataAlreadySet);
        }
        self.metadata = Some(metadata);
        Ok(self)
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.as_ref()
    }

    pub(crate) async fn read(&self) -> Result<Vec<u8>, std::io::Error> {
        match &self.source {
            DataSource::Bytes(bytes) => Ok(bytes.clone()),
            DataSource::Text(text) => Ok(text.as_bytes().to_vec()),
            DataSource::File(path) => tokio::fs::read(path).await,
        }
    }
}

pub(crate) fn check_description(description: &str) -> Result<(), DataItemError> {
    let length = description.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(DataItemError::DescriptionTooLong {
            length,
            limit: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(())
}
