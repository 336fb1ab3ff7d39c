use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::credentials::{CredentialCache, CredentialError};
use super::editing::{EditRequest, EditRequestBuilder, EditingError, EditingService, ExportFormat};
use super::identity::{ApplicantRecord, DocumentFields};
use super::job::{EditJob, JobState, JobTransitionError};
use super::storage::{
    AssetReference, AssetStore, AssetStoreError, StockAssetError, StockAssetPicker,
};
use crate::config::EditingConfig;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unable to obtain editing credential: {0}")]
    Auth(#[from] CredentialError),
    #[error("stock photo unavailable: {0}")]
    StockAsset(#[from] StockAssetError),
    #[error("asset staging failed: {0}")]
    Upload(#[from] AssetStoreError),
    #[error("edit submission rejected: {0}")]
    Submission(#[source] EditingError),
    #[error("edit job failed: {detail}")]
    Processing { detail: Value },
    #[error("status polling failed: {0}")]
    Polling(#[source] EditingError),
    #[error("edit job unfinished after {attempts} status checks ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },
    #[error("export failed: {0}")]
    Export(#[source] EditingError),
    #[error(transparent)]
    Job(#[from] JobTransitionError),
}

/// Store paths of the template and of the rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLocation {
    pub template_path: String,
    pub output_path: String,
    pub output_mime_type: String,
}

/// Cadence and upper bound of status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub template: TemplateLocation,
    pub polling: PollPolicy,
    pub export_format: ExportFormat,
}

impl OrchestratorSettings {
    pub fn from_config(config: &EditingConfig) -> Self {
        Self {
            template: TemplateLocation {
                template_path: config.template_path.clone(),
                output_path: config.output_path.clone(),
                output_mime_type: config.output_mime_type.clone(),
            },
            polling: PollPolicy {
                interval: config.poll_interval,
                timeout: config.poll_timeout,
            },
            export_format: ExportFormat::Pdf,
        }
    }
}

/// Drives one applicant through credential, staging, edit, polling and export.
#[derive(Debug)]
pub struct RemoteEditOrchestrator {
    credentials: Arc<CredentialCache>,
    assets: Arc<dyn AssetStore>,
    stock: Arc<dyn StockAssetPicker>,
    editing: Arc<dyn EditingService>,
    builder: Box<dyn EditRequestBuilder>,
    settings: OrchestratorSettings,
}

impl RemoteEditOrchestrator {
    pub fn new(
        credentials: Arc<CredentialCache>,
        assets: Arc<dyn AssetStore>,
        stock: Arc<dyn StockAssetPicker>,
        editing: Arc<dyn EditingService>,
        builder: Box<dyn EditRequestBuilder>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            credentials,
            assets,
            stock,
            editing,
            builder,
            settings,
        }
    }

    /// Populates the template for `record` with the signature at `signature`
    /// and returns the exported document bytes.
    pub async fn submit_and_wait_for_edit(
        &self,
        record: &ApplicantRecord,
        signature: &Path,
    ) -> Result<Vec<u8>, OrchestratorError> {
        self.credentials.bearer().await?;

        let photo = self.stock.pick().await?;
        debug!(photo = %photo.display(), "stock photo selected");

        let template = &self.settings.template;
        let (signature_ref, photo_ref, template_ref, output_ref) = tokio::try_join!(
            self.assets.stage(signature),
            self.assets.stage(&photo),
            self.assets.temporary_link(&template.template_path),
            self.assets.temporary_upload_target(&template.output_path),
        )?;
        info!(template = %template.template_path, "edit inputs staged");

        let fields = DocumentFields::derive(record, &mut rand::thread_rng());
        debug!(identifier = %fields.identifier, "document fields derived");

        let request = EditRequest::for_document(
            &fields,
            photo_ref,
            signature_ref,
            template_ref,
            output_ref,
            template.output_mime_type.clone(),
        );
        let payload = &self.builder.build(&request);

        let submitted = self
            .with_credential(|token| async move {
                self.editing.submit_edit(&token, payload).await
            })
            .await?
            .map_err(OrchestratorError::Submission)?;
        info!(status_url = %submitted.status_url, path = %payload.path, "edit job submitted");

        let mut job = EditJob::submitted(&request, submitted);
        let output = self.wait_for_output(&mut job).await?;

        let (output, format) = (&output, self.settings.export_format);
        let bytes = self
            .with_credential(|token| async move {
                self.editing.export_format(&token, output, format).await
            })
            .await?
            .map_err(OrchestratorError::Export)?;
        info!(
            bytes = bytes.len(),
            format = self.settings.export_format.as_str(),
            "edit output exported"
        );
        Ok(bytes)
    }

    /// Polls `job` until it reaches a terminal state or the poll timeout runs out.
    /// The first query is issued immediately.
    pub async fn wait_for_output(
        &self,
        job: &mut EditJob,
    ) -> Result<AssetReference, OrchestratorError> {
        let PollPolicy { interval, timeout } = self.settings.polling;
        let started = Instant::now();

        loop {
            let status_url = job.status_url();
            let status = self
                .with_credential(|token| async move {
                    self.editing.get_status(&token, status_url).await
                })
                .await?
                .map_err(OrchestratorError::Polling)?;

            match job.observe(status)?.clone() {
                JobState::Succeeded(output) => {
                    info!(attempts = job.attempts(), output = %output, "edit job succeeded");
                    return Ok(output);
                }
                JobState::Failed(detail) => {
                    warn!(attempts = job.attempts(), %detail, "edit job failed");
                    return Err(OrchestratorError::Processing { detail });
                }
                JobState::Polling {
                    attempts,
                    last_status,
                } => {
                    debug!(
                        attempts,
                        status = %last_status,
                        status_url = job.status_url(),
                        "edit job still running"
                    );
                }
                JobState::Submitted => {}
            }

            let elapsed = started.elapsed();
            if elapsed.saturating_add(interval) > timeout {
                warn!(attempts = job.attempts(), ?elapsed, "edit job exceeded poll timeout");
                return Err(OrchestratorError::Timeout {
                    attempts: job.attempts(),
                    elapsed,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Runs `call` with the cached bearer token. A 401 from the editing service
    /// drops the cached credential and repeats the call once with a fresh one.
    async fn with_credential<T, F, Fut>(
        &self,
        call: F,
    ) -> Result<Result<T, EditingError>, CredentialError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, EditingError>>,
    {
        let token = self.credentials.bearer().await?;
        match call(token).await {
            Err(EditingError::Rejected { status: 401, .. }) => {
                warn!("editing service refused the cached credential, refreshing");
                self.credentials.invalidate().await;
                let token = self.credentials.bearer().await?;
                Ok(call(token).await)
            }
            outcome => Ok(outcome),
        }
    }
}
