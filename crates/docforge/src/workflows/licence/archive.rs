use std::path::PathBuf;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive id is empty")]
    MissingId,
    #[error("archived file name is empty")]
    MissingName,
    #[error("unable to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Flat directory of client-submitted results, one file per `<id>_<name>`.
#[derive(Debug, Clone)]
pub struct ResultArchive {
    directory: PathBuf,
}

impl ResultArchive {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Writes `contents` as `<id>_<file_name>` and returns the stored path.
    /// An existing file with the same name is replaced.
    pub async fn store(
        &self,
        id: &str,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, ArchiveError> {
        let id = sanitize(id);
        if id.is_empty() {
            return Err(ArchiveError::MissingId);
        }
        let name = sanitize(file_name);
        if name.is_empty() {
            return Err(ArchiveError::MissingName);
        }

        let path = self.directory.join(format!("{id}_{name}"));
        let write_error = |source| ArchiveError::Write {
            path: path.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(write_error)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(write_error)?;

        info!(path = %path.display(), bytes = contents.len(), "result archived");
        Ok(path)
    }
}

/// Keeps only the final path component and drops characters that could
/// escape the archive directory.
fn sanitize(raw: &str) -> String {
    let last = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();
    if cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned
    }
}
