mod dropbox;
mod stock;

use std::fmt::{self, Debug};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use dropbox::DropboxAssetStore;
pub use stock::{DirectoryStockPicker, StockAssetError, StockAssetPicker};

/// Fetchable pointer to a staged file, handed to the editing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference(pub String);

impl AssetReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-side location of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetStoreError {
    #[error("unable to read local asset {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage request failed with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("storage backend unreachable: {0}")]
    Transport(String),
    #[error("storage response malformed: {0}")]
    Malformed(String),
}

/// Cloud storage used to stage inputs and receive outputs of an edit job.
#[async_trait]
pub trait AssetStore: Debug + Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<AssetHandle, AssetStoreError>;

    /// Public link to an uploaded file. An existing link is returned as-is.
    async fn shareable_link(&self, handle: &AssetHandle) -> Result<AssetReference, AssetStoreError>;

    /// Short-lived download link for a file already in the store.
    async fn temporary_link(&self, stored_path: &str) -> Result<AssetReference, AssetStoreError>;

    /// Short-lived link the editing service can write its output to.
    async fn temporary_upload_target(
        &self,
        stored_path: &str,
    ) -> Result<AssetReference, AssetStoreError>;

    /// Uploads a local file and returns a durable fetchable reference to it.
    async fn stage(&self, local_path: &Path) -> Result<AssetReference, AssetStoreError> {
        let handle = self.upload(local_path).await?;
        self.shareable_link(&handle).await
    }
}
