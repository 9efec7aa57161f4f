use crate::cli::{MockModelsArgs, ServeArgs};
use crate::infra::AppState;
use crate::routes::with_application_routes;
use asd_screening::config::{AppConfig, ServerConfig};
use asd_screening::error::AppError;
use asd_screening::session::SessionRegistry;
use asd_screening::telemetry;
use asd_screening::workflows::consult::{ConsultService, DoctorDirectory};
use asd_screening::workflows::screening::{
    default_models, mock_prediction_router_for, HttpPredictionClient, ModelName,
    ScreeningService, SubmissionOrchestrator,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    let client = HttpPredictionClient::new(&config.prediction)?;
    let sessions = Arc::new(SessionRegistry::default());
    let screening = Arc::new(ScreeningService::new(
        SubmissionOrchestrator::new(Arc::new(client)),
        sessions.clone(),
    ));
    let consult = Arc::new(ConsultService::new(
        DoctorDirectory::default(),
        sessions.clone(),
    ));

    let app = with_application_routes(sessions, screening, consult)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        prediction_api = %config.prediction.base_url,
        "screening orchestrator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) async fn run_mock_models(args: MockModelsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let models = if args.models.is_empty() {
        default_models()
    } else {
        args.models.into_iter().map(ModelName::new).collect()
    };
    let addr = ServerConfig {
        host: args.host,
        port: args.port,
    }
    .socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let names: Vec<&str> = models.iter().map(ModelName::as_str).collect();
    info!(%addr, models = ?names, "mock prediction API listening");

    axum::serve(listener, mock_prediction_router_for(models)).await?;
    Ok(())
}
