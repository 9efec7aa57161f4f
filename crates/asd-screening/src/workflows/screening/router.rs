use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{AnswerSet, DemographicRecord};
use super::gateway::PredictionGateway;
use super::orchestrator::{SubmissionError, SubmissionOrchestrator};
use super::outcome_store::OutcomeStore;
use super::questions::questions;
use super::results::ResultsView;
use crate::session::router::{authenticated_session, internal_error};
use crate::session::SessionRegistry;

/// Body of `POST /api/v1/screening/submissions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(default)]
    pub demographics: DemographicRecord,
}

/// Shared state behind the screening routes.
pub struct ScreeningService<G> {
    orchestrator: SubmissionOrchestrator<G>,
    sessions: Arc<SessionRegistry>,
}

impl<G> ScreeningService<G>
where
    G: PredictionGateway + 'static,
{
    pub fn new(orchestrator: SubmissionOrchestrator<G>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            orchestrator,
            sessions,
        }
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator<G> {
        &self.orchestrator
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

/// Router builder exposing the questionnaire, submission, and results endpoints.
pub fn screening_router<G>(service: Arc<ScreeningService<G>>) -> Router
where
    G: PredictionGateway + 'static,
{
    Router::new()
        .route("/api/v1/screening/questions", get(questions_handler))
        .route("/api/v1/screening/submissions", post(submit_handler::<G>))
        .route("/api/v1/screening/results", get(results_handler::<G>))
        .with_state(service)
}

pub(crate) async fn questions_handler() -> Response {
    let catalog = questions();
    let payload = json!({
        "count": catalog.len(),
        "questions": catalog,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn submit_handler<G>(
    State(service): State<Arc<ScreeningService<G>>>,
    headers: HeaderMap,
    Json(request): Json<SubmissionRequest>,
) -> Response
where
    G: PredictionGateway + 'static,
{
    let session = match authenticated_session(&service.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let store = OutcomeStore::new(session.session.clone());

    match service
        .orchestrator
        .submit(&request.answers, &request.demographics, &store)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            let message = err.to_string();
            match err {
                SubmissionError::IncompleteInput(problems) => {
                    let payload = json!({
                        "error": message,
                        "missing_fields": problems.missing_fields,
                        "unanswered_questions": problems.unanswered_questions,
                        "invalid_age": problems.invalid_age,
                    });
                    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
                }
                SubmissionError::AllModelsFailed { failures } => {
                    let failures: Vec<_> = failures
                        .iter()
                        .map(|failure| {
                            json!({
                                "model": failure.model,
                                "error": failure.error.to_string(),
                            })
                        })
                        .collect();
                    let payload = json!({
                        "error": message,
                        "failures": failures,
                    });
                    (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
                }
                SubmissionError::Storage(_) => internal_error(message),
            }
        }
    }
}

pub(crate) async fn results_handler<G>(
    State(service): State<Arc<ScreeningService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: PredictionGateway + 'static,
{
    let session = match authenticated_session(&service.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let store = OutcomeStore::new(session.session.clone());

    match store.load() {
        Ok(Some(outcome)) => {
            let view = ResultsView::for_models(&outcome, service.orchestrator.models());
            (StatusCode::OK, Json(view)).into_response()
        }
        Ok(None) => {
            let payload = json!({
                "error": "No Results Found",
                "next": "/screening",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => internal_error(err.to_string()),
    }
}
