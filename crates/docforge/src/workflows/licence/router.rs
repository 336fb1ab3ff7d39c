use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use rand::Rng;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::archive::{ArchiveError, ResultArchive};
use super::identity::{ApplicantForm, ApplicantRecord, IdentityError};
use super::orchestrator::{OrchestratorError, RemoteEditOrchestrator};

pub const PDF_FILE_NAME: &str = "generated_document.pdf";
const GENERATE_FAILURE: &str = "Failed to generate PDF";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("multipart body unreadable: {0}")]
    Multipart(String),
    #[error("signature file missing from form")]
    MissingSignature,
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("unable to persist signature at {path}: {source}")]
    Signature {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl From<MultipartError> for GenerateError {
    fn from(value: MultipartError) -> Self {
        Self::Multipart(value.to_string())
    }
}

/// Signature image received with a generate request.
#[derive(Debug, Clone)]
pub struct SignatureUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Shared state behind the browser-facing routes.
#[derive(Debug)]
pub struct LicenceService {
    orchestrator: RemoteEditOrchestrator,
    archive: ResultArchive,
    upload_dir: PathBuf,
}

impl LicenceService {
    pub fn new(
        orchestrator: RemoteEditOrchestrator,
        archive: ResultArchive,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            orchestrator,
            archive,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn archive(&self) -> &ResultArchive {
        &self.archive
    }

    /// Persists the signature, runs the remote edit, and removes the signature
    /// file again whatever the outcome.
    pub async fn generate(
        &self,
        form: ApplicantForm,
        signature: SignatureUpload,
    ) -> Result<Vec<u8>, GenerateError> {
        let record = ApplicantRecord::from_form(form, &mut rand::thread_rng())?;
        let path = self.persist_signature(&signature).await?;

        let outcome = self
            .orchestrator
            .submit_and_wait_for_edit(&record, &path)
            .await;

        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %err, "unable to remove signature file");
        }
        Ok(outcome?)
    }

    async fn persist_signature(
        &self,
        signature: &SignatureUpload,
    ) -> Result<PathBuf, GenerateError> {
        let path = self
            .upload_dir
            .join(signature_file_name(signature.file_name.as_deref()));
        let io_error = |source| GenerateError::Signature {
            path: path.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(io_error)?;
        tokio::fs::write(&path, &signature.bytes)
            .await
            .map_err(io_error)?;
        Ok(path)
    }
}

/// Unique per-request name that keeps the client's extension so the store can
/// infer the content type.
fn signature_file_name(client_name: Option<&str>) -> String {
    let extension = client_name
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("png");
    let nonce: u32 = rand::thread_rng().gen();
    format!(
        "signature-{}-{nonce:08x}.{extension}",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Router exposing `/generate-pdf` and `/upload`.
pub fn licence_router(service: Arc<LicenceService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/generate-pdf", post(generate_pdf_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

async fn read_generate_form(
    mut multipart: Multipart,
) -> Result<(ApplicantForm, SignatureUpload), GenerateError> {
    let mut form = ApplicantForm::default();
    let mut signature = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "signature" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    signature = Some(SignatureUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "firstName" => form.first_name = field.text().await?,
            "lastName" => form.last_name = field.text().await?,
            "address1" => form.address1 = field.text().await?,
            "address2" => form.address2 = field.text().await?,
            "dateOfBirth" => form.date_of_birth = Some(field.text().await?),
            _ => {}
        }
    }

    let signature = signature.ok_or(GenerateError::MissingSignature)?;
    Ok((form, signature))
}

pub(crate) async fn generate_pdf_handler(
    State(service): State<Arc<LicenceService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(multipart) => match read_generate_form(multipart).await {
            Ok((form, signature)) => service.generate(form, signature).await,
            Err(err) => Err(err),
        },
        Err(rejection) => Err(GenerateError::Multipart(rejection.body_text())),
    };

    match result {
        Ok(pdf) => {
            info!(bytes = pdf.len(), "document generated");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::APPLICATION_PDF.as_ref().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{PDF_FILE_NAME}\""),
                    ),
                ],
                pdf,
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "document generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, GENERATE_FAILURE).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadQuery {
    #[serde(default)]
    id: Option<String>,
}

async fn read_upload_file(
    mut multipart: Multipart,
) -> Result<Option<(String, Vec<u8>)>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

pub(crate) async fn upload_handler(
    State(service): State<Arc<LicenceService>>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let upload = match multipart {
        Ok(multipart) => match read_upload_file(multipart).await {
            Ok(upload) => upload,
            Err(err) => {
                warn!(error = %err, "unreadable upload body");
                None
            }
        },
        Err(_) => None,
    };

    let Some((file_name, bytes)) = upload else {
        return (StatusCode::BAD_REQUEST, "No file uploaded.").into_response();
    };
    let Some(id) = query.id.filter(|id| !id.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "No ID provided.").into_response();
    };

    match service.archive().store(&id, &file_name, &bytes).await {
        Ok(path) => {
            let stored = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(file_name.as_str())
                .to_string();
            (
                StatusCode::OK,
                format!("File uploaded successfully with ID {id}: {stored}"),
            )
                .into_response()
        }
        Err(ArchiveError::MissingId) => {
            warn!(id = %id, "upload id has no usable characters");
            (StatusCode::BAD_REQUEST, "No ID provided.").into_response()
        }
        Err(err @ ArchiveError::MissingName) => {
            warn!(error = %err, "rejected upload");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => {
            error!(error = %err, "unable to archive upload");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file.").into_response()
        }
    }
}
