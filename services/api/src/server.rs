use crate::cli::ServeArgs;
use crate::infra::{build_licence_service, AppState};
use crate::routes::with_licence_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use docforge::config::AppConfig;
use docforge::error::AppError;
use docforge::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    tokio::fs::create_dir_all(&config.files.upload_dir).await?;
    tokio::fs::create_dir_all(&config.files.responses_dir).await?;
    let licence_service = Arc::new(build_licence_service(&config)?);

    let app = with_licence_routes(licence_service, config.files.max_upload_bytes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        variant = ?config.editing.request_variant,
        "document generation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
