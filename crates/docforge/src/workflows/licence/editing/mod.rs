//! Client side of the remote layered-document editing service.
//!
//! The service works asynchronously: a submitted edit returns a status URL which
//! is polled until the job reaches a terminal state, after which the rendered
//! output can be exported to a downloadable format.

pub mod requests;

use std::fmt::{self, Debug};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{json, Value};

use crate::config::EditingConfig;
use crate::workflows::licence::storage::AssetReference;

pub use requests::{
    DocumentOperationsBuilder, EditPayload, EditRequest, EditRequestBuilder, LayerEdit,
    LegacyOperationsBuilder, RequestVariant, TextLayerBuilder,
};

/// Handle returned when the service accepts an edit job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub status_url: String,
}

/// Snapshot of a remote job as reported by its status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Any non-terminal state (`pending`, `running`, ...), carrying the raw label.
    InProgress(String),
    Succeeded { output: Option<AssetReference> },
    Failed { detail: Value },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    pub fn pending() -> Self {
        Self::InProgress("pending".to_string())
    }

    /// Reads either a per-output status (`outputs[0].status`) or a top-level one.
    pub fn from_body(body: &Value) -> Result<Self, EditingError> {
        let output = body.pointer("/outputs/0");
        let state = output
            .and_then(|entry| entry.get("status"))
            .or_else(|| body.get("status"))
            .and_then(Value::as_str)
            .ok_or_else(|| EditingError::Malformed(format!("status missing in {body}")))?;

        match state.to_ascii_lowercase().as_str() {
            "succeeded" | "success" | "done" => {
                let href = output
                    .and_then(|entry| {
                        entry
                            .pointer("/_links/renditions/0/href")
                            .or_else(|| entry.get("href"))
                    })
                    .or_else(|| body.get("output"))
                    .and_then(Value::as_str);
                Ok(Self::Succeeded {
                    output: href.map(|href| AssetReference(href.to_string())),
                })
            }
            "failed" | "error" => {
                let detail = output
                    .and_then(|entry| entry.get("errors"))
                    .or_else(|| body.get("errors"))
                    .cloned()
                    .unwrap_or_else(|| body.clone());
                Ok(Self::Failed { detail })
            }
            other => Ok(Self::InProgress(other.to_string())),
        }
    }
}

/// Target formats offered by the export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> mime::Mime {
        match self {
            Self::Pdf => mime::APPLICATION_PDF,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditingError {
    #[error("editing service responded {status}: {detail}")]
    Rejected { status: u16, detail: Value },
    #[error("editing service unreachable: {0}")]
    Transport(String),
    #[error("editing service response malformed: {0}")]
    Malformed(String),
}

/// Remote editing capability used by the orchestrator.
#[async_trait]
pub trait EditingService: Debug + Send + Sync {
    async fn submit_edit(
        &self,
        token: &str,
        payload: &EditPayload,
    ) -> Result<SubmittedJob, EditingError>;

    async fn get_status(&self, token: &str, status_url: &str) -> Result<JobStatus, EditingError>;

    async fn export_format(
        &self,
        token: &str,
        asset: &AssetReference,
        format: ExportFormat,
    ) -> Result<Vec<u8>, EditingError>;
}

/// HTTP client for a Photoshop-style editing API.
pub struct PhotoshopClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    export_url: String,
}

impl PhotoshopClient {
    pub fn new(http: reqwest::Client, config: &EditingConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            export_url: config.export_url.clone(),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        let builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("x-api-key", &self.api_key)
        }
    }

    fn map_error(err: reqwest::Error) -> EditingError {
        EditingError::Transport(err.to_string())
    }
}

impl Debug for PhotoshopClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoshopClient")
            .field("api_url", &self.api_url)
            .field("export_url", &self.export_url)
            .finish_non_exhaustive()
    }
}

async fn rejection(response: reqwest::Response) -> EditingError {
    let status = response.status().as_u16();
    let raw = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
    EditingError::Rejected { status, detail }
}

#[async_trait]
impl EditingService for PhotoshopClient {
    async fn submit_edit(
        &self,
        token: &str,
        payload: &EditPayload,
    ) -> Result<SubmittedJob, EditingError> {
        let url = format!("{}{}", self.api_url, payload.path);
        let response = self
            .authorized(self.http.post(&url), token)
            .json(&payload.body)
            .send()
            .await
            .map_err(Self::map_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| EditingError::Malformed(err.to_string()))?;
        let status_url = body
            .pointer("/_links/self/href")
            .or_else(|| body.get("statusUrl"))
            .and_then(Value::as_str)
            .ok_or_else(|| EditingError::Malformed(format!("status link missing in {body}")))?;

        Ok(SubmittedJob {
            status_url: status_url.to_string(),
        })
    }

    async fn get_status(&self, token: &str, status_url: &str) -> Result<JobStatus, EditingError> {
        let response = self
            .authorized(self.http.get(status_url), token)
            .send()
            .await
            .map_err(Self::map_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| EditingError::Malformed(err.to_string()))?;
        JobStatus::from_body(&body)
    }

    async fn export_format(
        &self,
        token: &str,
        asset: &AssetReference,
        format: ExportFormat,
    ) -> Result<Vec<u8>, EditingError> {
        let response = self
            .authorized(self.http.post(&self.export_url), token)
            .header(ACCEPT, format.mime().as_ref())
            .json(&json!({ "format": format.as_str(), "file": asset.as_str() }))
            .send()
            .await
            .map_err(Self::map_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let bytes = response.bytes().await.map_err(Self::map_error)?;
        if bytes.is_empty() {
            return Err(EditingError::Malformed("export returned an empty body".to_string()));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn client_for(server: &mockito::ServerGuard) -> PhotoshopClient {
        let config = EditingConfig {
            api_url: server.url(),
            api_key: "api-key".to_string(),
            export_url: format!("{}/export", server.url()),
            request_variant: RequestVariant::DocumentOperations,
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(300),
            template_path: "/templates/licence.psd".to_string(),
            output_path: "/renders/licence.psd".to_string(),
            output_mime_type: "image/png".to_string(),
        };
        PhotoshopClient::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn parses_output_level_statuses() {
        let pending = json!({ "jobId": "j1", "outputs": [{ "status": "pending" }] });
        assert_eq!(
            JobStatus::from_body(&pending).expect("parses"),
            JobStatus::pending()
        );

        let done = json!({
            "outputs": [{
                "status": "succeeded",
                "_links": { "renditions": [{ "href": "https://files.test/out.psd" }] }
            }]
        });
        assert_eq!(
            JobStatus::from_body(&done).expect("parses"),
            JobStatus::Succeeded {
                output: Some(AssetReference("https://files.test/out.psd".to_string()))
            }
        );

        let failed = json!({
            "outputs": [{ "status": "failed", "errors": { "code": 400, "title": "layer missing" } }]
        });
        match JobStatus::from_body(&failed).expect("parses") {
            JobStatus::Failed { detail } => assert_eq!(detail["title"], "layer missing"),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn parses_top_level_status_and_rejects_missing_status() {
        let body = json!({ "status": "running" });
        let status = JobStatus::from_body(&body).expect("parses");
        assert!(!status.is_terminal());

        let err = JobStatus::from_body(&json!({ "jobId": "x" })).expect_err("no status");
        assert!(matches!(err, EditingError::Malformed(_)));
    }

    #[tokio::test]
    async fn submit_posts_payload_and_returns_status_link() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pie/psdService/documentOperations")
            .match_header("authorization", "Bearer token-1")
            .match_header("x-api-key", "api-key")
            .match_body(Matcher::PartialJsonString(r#"{"options":{}}"#.to_string()))
            .with_status(202)
            .with_body(r#"{"_links":{"self":{"href":"https://status.test/jobs/42"}}}"#)
            .create_async()
            .await;

        let payload = EditPayload {
            path: "/pie/psdService/documentOperations".to_string(),
            body: json!({ "options": {} }),
        };
        let job = client_for(&server)
            .submit_edit("token-1", &payload)
            .await
            .expect("submitted");

        mock.assert_async().await;
        assert_eq!(job.status_url, "https://status.test/jobs/42");
    }

    #[tokio::test]
    async fn submit_rejection_carries_vendor_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/operations")
            .with_status(400)
            .with_body(r#"{"type":"InputValidationError","title":"bad layer"}"#)
            .create_async()
            .await;

        let payload = EditPayload {
            path: "/operations".to_string(),
            body: json!({ "operations": [] }),
        };
        let err = client_for(&server)
            .submit_edit("token-1", &payload)
            .await
            .expect_err("rejected");
        match err {
            EditingError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail["title"], "bad layer");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn status_and_export_round_trip() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/status/42")
            .with_status(200)
            .with_body(r#"{"outputs":[{"status":"succeeded","_links":{"renditions":[{"href":"https://files.test/out.psd"}]}}]}"#)
            .create_async()
            .await;
        let export = server
            .mock("POST", "/export")
            .match_header("accept", "application/pdf")
            .match_body(Matcher::Json(
                json!({ "format": "pdf", "file": "https://files.test/out.psd" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.7 body")
            .create_async()
            .await;

        let client = client_for(&server);
        let status = client
            .get_status("token-1", &format!("{}/status/42", server.url()))
            .await
            .expect("status");
        let output = match status {
            JobStatus::Succeeded { output: Some(output) } => output,
            other => panic!("unexpected status {other:?}"),
        };

        let bytes = client
            .export_format("token-1", &output, ExportFormat::Pdf)
            .await
            .expect("exported");
        export.assert_async().await;
        assert!(bytes.starts_with(b"%PDF"));
    }
}
