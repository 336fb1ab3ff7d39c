use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;

#[derive(Debug, thiserror::Error)]
pub enum StockAssetError {
    #[error("unable to list stock photos in {path}: {source}")]
    Listing {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no stock photos available in {0}")]
    Empty(String),
}

/// Supplies the stock photo placed into the template's photo layer.
#[async_trait]
pub trait StockAssetPicker: Debug + Send + Sync {
    async fn pick(&self) -> Result<PathBuf, StockAssetError>;
}

/// Picks uniformly among the image files of a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryStockPicker {
    directory: PathBuf,
}

impl DirectoryStockPicker {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    async fn candidates(&self) -> Result<Vec<PathBuf>, StockAssetError> {
        let listing_error = |source| StockAssetError::Listing {
            path: self.directory.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(listing_error)?;
        let mut photos = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            let path = entry.path();
            if is_file && is_image(&path) {
                photos.push(path);
            }
        }
        photos.sort();
        Ok(photos)
    }
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|guess| guess.type_() == mime::IMAGE)
        .unwrap_or(false)
}

#[async_trait]
impl StockAssetPicker for DirectoryStockPicker {
    async fn pick(&self) -> Result<PathBuf, StockAssetError> {
        let mut photos = self.candidates().await?;
        if photos.is_empty() {
            return Err(StockAssetError::Empty(self.directory.display().to_string()));
        }
        let index = rand::thread_rng().gen_range(0..photos.len());
        Ok(photos.swap_remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "docforge-stock-{label}-{}",
            std::process::id()
        ));
        tokio::fs::remove_dir_all(&dir).await.ok();
        tokio::fs::create_dir_all(&dir).await.expect("create scratch dir");
        dir
    }

    #[tokio::test]
    async fn picks_only_image_files() {
        let dir = scratch_dir("images").await;
        tokio::fs::write(dir.join("face-1.jpg"), b"jpg").await.expect("write");
        tokio::fs::write(dir.join("face-2.png"), b"png").await.expect("write");
        tokio::fs::write(dir.join("notes.txt"), b"txt").await.expect("write");
        tokio::fs::create_dir_all(dir.join("nested.png"))
            .await
            .expect("dir");

        let picker = DirectoryStockPicker::new(&dir);
        for _ in 0..20 {
            let picked = picker.pick().await.expect("photo picked");
            let name = picked.file_name().and_then(|n| n.to_str()).unwrap_or("");
            assert!(name == "face-1.jpg" || name == "face-2.png", "picked {name}");
        }

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn empty_directory_is_an_error() {
        let dir = scratch_dir("empty").await;
        let err = DirectoryStockPicker::new(&dir)
            .pick()
            .await
            .expect_err("nothing to pick");
        assert!(matches!(err, StockAssetError::Empty(_)));
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_directory_is_a_listing_error() {
        let err = DirectoryStockPicker::new("/no/such/stock/dir")
            .pick()
            .await
            .expect_err("missing dir");
        assert!(matches!(err, StockAssetError::Listing { .. }));
    }
}
