use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::json;

use crate::workflows::licence::{
    AssetHandle, AssetReference, AssetStore, AssetStoreError, BearerCredential, CredentialCache,
    CredentialError, EditPayload, EditingError, EditingService, ExportFormat, JobStatus,
    LicenceService, OrchestratorSettings, PollPolicy, RemoteEditOrchestrator, RequestVariant,
    ResultArchive, StockAssetError, StockAssetPicker, SubmittedJob, TemplateLocation,
    TokenProvider,
};

pub(super) const BOUNDARY: &str = "docforge-test-boundary";
pub(super) const RENDERED_PDF: &[u8] = b"%PDF-1.7 licence";

pub(super) struct StaticTokens;

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn fetch_token(&self) -> Result<BearerCredential, CredentialError> {
        Ok(BearerCredential::new(
            "token",
            Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

#[derive(Debug)]
pub(super) struct LinkingStore;

#[async_trait]
impl AssetStore for LinkingStore {
    async fn upload(&self, local_path: &Path) -> Result<AssetHandle, AssetStoreError> {
        Ok(AssetHandle {
            path: local_path.display().to_string(),
        })
    }

    async fn shareable_link(&self, handle: &AssetHandle) -> Result<AssetReference, AssetStoreError> {
        Ok(AssetReference(format!("https://store.test{}", handle.path)))
    }

    async fn temporary_link(&self, stored_path: &str) -> Result<AssetReference, AssetStoreError> {
        Ok(AssetReference(format!("https://store.test/tmp{stored_path}")))
    }

    async fn temporary_upload_target(
        &self,
        stored_path: &str,
    ) -> Result<AssetReference, AssetStoreError> {
        Ok(AssetReference(format!("https://store.test/put{stored_path}")))
    }
}

#[derive(Debug)]
pub(super) struct OnePhoto;

#[async_trait]
impl StockAssetPicker for OnePhoto {
    async fn pick(&self) -> Result<PathBuf, StockAssetError> {
        Ok(PathBuf::from("/stock/face.jpg"))
    }
}

/// Finishes every job on the first status query, either successfully or not.
#[derive(Debug)]
pub(super) struct InstantEditing {
    pub(super) succeed: bool,
}

#[async_trait]
impl EditingService for InstantEditing {
    async fn submit_edit(
        &self,
        _token: &str,
        _payload: &EditPayload,
    ) -> Result<SubmittedJob, EditingError> {
        Ok(SubmittedJob {
            status_url: "https://edit.test/status/1".to_string(),
        })
    }

    async fn get_status(&self, _token: &str, _status_url: &str) -> Result<JobStatus, EditingError> {
        if self.succeed {
            Ok(JobStatus::Succeeded { output: None })
        } else {
            Ok(JobStatus::Failed {
                detail: json!({ "code": "InternalError", "secret": "vendor-detail" }),
            })
        }
    }

    async fn export_format(
        &self,
        _token: &str,
        _asset: &AssetReference,
        _format: ExportFormat,
    ) -> Result<Vec<u8>, EditingError> {
        Ok(RENDERED_PDF.to_vec())
    }
}

pub(super) fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "docforge-routes-{label}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

pub(super) fn build_service(root: &Path, succeed: bool) -> Arc<LicenceService> {
    let credentials = Arc::new(CredentialCache::new(
        Arc::new(StaticTokens),
        Duration::from_secs(60),
    ));
    let orchestrator = RemoteEditOrchestrator::new(
        credentials,
        Arc::new(LinkingStore),
        Arc::new(OnePhoto),
        Arc::new(InstantEditing { succeed }),
        RequestVariant::TextLayers.builder(),
        OrchestratorSettings {
            template: TemplateLocation {
                template_path: "/templates/licence.psd".to_string(),
                output_path: "/renders/licence.psd".to_string(),
                output_mime_type: "vnd.adobe.photoshop".to_string(),
            },
            polling: PollPolicy::default(),
            export_format: ExportFormat::Pdf,
        },
    );
    Arc::new(LicenceService::new(
        orchestrator,
        ResultArchive::new(root.join("responses")),
        root.join("uploads"),
    ))
}

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request builds")
}

pub(super) fn applicant_parts<'a>(signature: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("firstName", "Jane"),
        Part::Text("lastName", "Smith"),
        Part::Text("address1", "1 Main St"),
        Part::Text("address2", "Springfield"),
        Part::File {
            field: "signature",
            file_name: "sig.png",
            content_type: "image/png",
            bytes: signature,
        },
    ]
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_text_body(response: Response) -> String {
    String::from_utf8(read_body(response).await).expect("utf8 body")
}

pub(super) async fn file_count(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}
