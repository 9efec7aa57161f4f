use crate::infra::AppState;
use asd_screening::session::{auth_router, SessionRegistry};
use asd_screening::workflows::consult::{consult_router, ConsultService};
use asd_screening::workflows::screening::{
    screening_router, PredictionGateway, ScreeningService,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_application_routes<G>(
    sessions: Arc<SessionRegistry>,
    screening: Arc<ScreeningService<G>>,
    consult: Arc<ConsultService>,
) -> axum::Router
where
    G: PredictionGateway + 'static,
{
    auth_router(sessions)
        .merge(screening_router(screening))
        .merge(consult_router(consult))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use asd_screening::workflows::consult::DoctorDirectory;
    use asd_screening::workflows::screening::{
        mock_prediction_router, HttpPredictionClient, SubmissionOrchestrator,
    };
    use asd_screening::config::PredictionApiConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let config = PredictionApiConfig {
            base_url: PredictionApiConfig::parse_url("http://127.0.0.1:9").expect("url"),
            timeout: None,
        };
        let client = HttpPredictionClient::new(&config).expect("client");
        let sessions = Arc::new(SessionRegistry::default());
        let screening = Arc::new(ScreeningService::new(
            SubmissionOrchestrator::new(Arc::new(client)),
            sessions.clone(),
        ));
        let consult = Arc::new(ConsultService::new(
            DoctorDirectory::default(),
            sessions.clone(),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        with_application_routes(sessions, screening, consult).layer(Extension(state))
    }

    async fn get(router: axum::Router, path: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn health_and_readiness_report_state() {
        assert_eq!(get(app(true), "/health").await.1["status"], "ok");

        let (status, body) = get(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, body) = get(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn workflow_routes_are_mounted() {
        let (status, body) = get(app(true), "/api/v1/screening/questions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 10);

        let (status, body) = get(app(true), "/api/v1/doctors?q=rajesh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["doctors"][0]["name"], "Dr. Rajesh Sharma");

        let (status, body) = get(app(true), "/api/v1/screening/results").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["redirect"], "/auth");
    }

    #[tokio::test]
    async fn mock_models_answer_at_root() {
        let (status, body) = get(mock_prediction_router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "ASD Screening API is running");
    }
}
