use chrono::NaiveDate;
use docforge::config::AppConfig;
use docforge::error::AppError;
use docforge::workflows::licence::{
    ClientCredentialsProvider, CredentialCache, DirectoryStockPicker, DropboxAssetStore,
    LicenceService, OrchestratorSettings, PhotoshopClient, RemoteEditOrchestrator, ResultArchive,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wires the production collaborators (OAuth provider, cloud store, editing
/// API, stock directory) behind one shared HTTP client.
pub(crate) fn build_licence_service(config: &AppConfig) -> Result<LicenceService, AppError> {
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    let provider = Arc::new(ClientCredentialsProvider::new(http.clone(), &config.auth));
    let credentials = Arc::new(CredentialCache::new(provider, config.auth.safety_margin));
    let assets = Arc::new(DropboxAssetStore::new(http.clone(), &config.storage));
    let stock = Arc::new(DirectoryStockPicker::new(&config.files.stock_photo_dir));
    let editing = Arc::new(PhotoshopClient::new(http, &config.editing));

    let orchestrator = RemoteEditOrchestrator::new(
        credentials,
        assets,
        stock,
        editing,
        config.editing.request_variant.builder(),
        OrchestratorSettings::from_config(&config.editing),
    );

    Ok(LicenceService::new(
        orchestrator,
        ResultArchive::new(&config.files.responses_dir),
        &config.files.upload_dir,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
