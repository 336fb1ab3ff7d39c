//! Licence document generation: applicant identity derivation, remote template
//! editing, and the browser-facing routes around it.

pub mod archive;
pub mod credentials;
pub mod editing;
pub mod identity;
pub mod job;
pub mod orchestrator;
pub mod router;
pub mod storage;

pub use archive::{ArchiveError, ResultArchive};
pub use credentials::{
    BearerCredential, ClientCredentialsProvider, CredentialCache, CredentialError, TokenProvider,
};
pub use editing::{
    EditPayload, EditRequest, EditRequestBuilder, EditingError, EditingService, ExportFormat,
    JobStatus, LayerEdit, PhotoshopClient, RequestVariant, SubmittedJob,
};
pub use identity::{
    derive_identifier, ApplicantForm, ApplicantRecord, DerivedIdentifier, DocumentFields,
    IdentityError,
};
pub use job::{EditJob, JobState, JobTransitionError};
pub use orchestrator::{
    OrchestratorError, OrchestratorSettings, PollPolicy, RemoteEditOrchestrator, TemplateLocation,
};
pub use router::{licence_router, GenerateError, LicenceService, SignatureUpload, PDF_FILE_NAME};
pub use storage::{
    AssetHandle, AssetReference, AssetStore, AssetStoreError, DirectoryStockPicker,
    DropboxAssetStore, StockAssetError, StockAssetPicker,
};

#[cfg(test)]
mod tests;
