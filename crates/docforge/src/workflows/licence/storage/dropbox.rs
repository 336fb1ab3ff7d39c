use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AssetHandle, AssetReference, AssetStore, AssetStoreError};
use crate::config::StorageConfig;

const TEMPORARY_UPLOAD_SECS: u32 = 14_400;

#[derive(Debug, Deserialize)]
struct UploadedFile {
    path_display: String,
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SharedLinkList {
    links: Vec<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct TemporaryLink {
    link: String,
}

/// Asset store speaking the Dropbox v2 HTTP API.
pub struct DropboxAssetStore {
    http: reqwest::Client,
    api_url: String,
    content_url: String,
    access_token: String,
    upload_folder: String,
}

impl DropboxAssetStore {
    pub fn new(http: reqwest::Client, config: &StorageConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            upload_folder: config.upload_folder.trim_end_matches('/').to_string(),
        }
    }

    fn map_error(err: reqwest::Error) -> AssetStoreError {
        AssetStoreError::Transport(err.to_string())
    }

    fn remote_path(&self, local_path: &Path) -> String {
        let name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());
        format!("{}/{}", self.upload_folder, name)
    }

    async fn rpc(&self, endpoint: &str, body: Value) -> Result<reqwest::Response, AssetStoreError> {
        self.http
            .post(format!("{}/2/{}", self.api_url, endpoint))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)
    }

    async fn existing_link(&self, path: &str) -> Result<AssetReference, AssetStoreError> {
        let response = self
            .rpc(
                "sharing/list_shared_links",
                json!({ "path": path, "direct_only": true }),
            )
            .await?;
        let listing: SharedLinkList = read_json(response).await?;
        listing
            .links
            .into_iter()
            .next()
            .map(|link| AssetReference(direct_download(&link.url)))
            .ok_or_else(|| {
                AssetStoreError::Malformed(format!("no existing shared link reported for {path}"))
            })
    }
}

impl fmt::Debug for DropboxAssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxAssetStore")
            .field("api_url", &self.api_url)
            .field("upload_folder", &self.upload_folder)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AssetStore for DropboxAssetStore {
    async fn upload(&self, local_path: &Path) -> Result<AssetHandle, AssetStoreError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| AssetStoreError::LocalFile {
                path: local_path.display().to_string(),
                source,
            })?;

        let argument = json!({
            "path": self.remote_path(local_path),
            "mode": "add",
            "autorename": true,
            "mute": false,
        });

        let response = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .header("Dropbox-API-Arg", header_safe_json(&argument))
            .body(bytes)
            .send()
            .await
            .map_err(Self::map_error)?;

        let uploaded: UploadedFile = read_json(response).await?;
        tracing::debug!(path = %uploaded.path_display, "asset uploaded");
        Ok(AssetHandle {
            path: uploaded.path_display,
        })
    }

    async fn shareable_link(&self, handle: &AssetHandle) -> Result<AssetReference, AssetStoreError> {
        let response = self
            .rpc(
                "sharing/create_shared_link_with_settings",
                json!({
                    "path": handle.path,
                    "settings": { "requested_visibility": "public" },
                }),
            )
            .await?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            if !body.contains("shared_link_already_exists") {
                return Err(AssetStoreError::Rejected { status: 409, body });
            }
            let existing = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .pointer("/error/shared_link_already_exists/metadata/url")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
            tracing::debug!(path = %handle.path, "shared link already exists");
            return match existing {
                Some(url) => Ok(AssetReference(direct_download(&url))),
                None => self.existing_link(&handle.path).await,
            };
        }

        let link: SharedLink = read_json(response).await?;
        Ok(AssetReference(direct_download(&link.url)))
    }

    async fn temporary_link(&self, stored_path: &str) -> Result<AssetReference, AssetStoreError> {
        let response = self
            .rpc("files/get_temporary_link", json!({ "path": stored_path }))
            .await?;
        let link: TemporaryLink = read_json(response).await?;
        Ok(AssetReference(link.link))
    }

    async fn temporary_upload_target(
        &self,
        stored_path: &str,
    ) -> Result<AssetReference, AssetStoreError> {
        let response = self
            .rpc(
                "files/get_temporary_upload_link",
                json!({
                    "commit_info": {
                        "path": stored_path,
                        "mode": "overwrite",
                        "autorename": false,
                        "mute": false,
                    },
                    "duration": TEMPORARY_UPLOAD_SECS,
                }),
            )
            .await?;
        let link: TemporaryLink = read_json(response).await?;
        Ok(AssetReference(link.link))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AssetStoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AssetStoreError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|err| AssetStoreError::Malformed(err.to_string()))
}

/// Shared links default to a preview page; `dl=1` serves the raw bytes.
fn direct_download(url: &str) -> String {
    if url.contains("dl=0") {
        url.replace("dl=0", "dl=1")
    } else {
        url.to_string()
    }
}

/// JSON for HTTP header transport: characters outside ASCII become `\uXXXX`
/// escapes, with UTF-16 surrogate pairs above the basic plane.
fn header_safe_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            for unit in c.encode_utf16(&mut [0; 2]) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    escaped
}
