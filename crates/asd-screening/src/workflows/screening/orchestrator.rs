use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    default_models, AnswerSet, DemographicRecord, IncompleteInput, ModelName, SubmissionOutcome,
    SubmissionPayload,
};
use super::fanout::settle_all;
use super::gateway::{PredictionError, PredictionGateway};
use super::outcome_store::OutcomeStore;
use crate::session::storage::{KeyValueStore, StorageError};

/// A model call that did not produce a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFailure {
    pub model: ModelName,
    pub error: PredictionError,
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    IncompleteInput(#[from] IncompleteInput),
    #[error("all prediction models failed: {}", join_failures(.failures))]
    AllModelsFailed { failures: Vec<ModelFailure> },
    #[error("screening outcome could not be saved: {0}")]
    Storage(#[from] StorageError),
}

fn join_failures(failures: &[ModelFailure]) -> String {
    if failures.is_empty() {
        return "no models were configured".to_string();
    }
    failures
        .iter()
        .map(ModelFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sends one payload to every configured model and keeps whatever comes back.
pub struct SubmissionOrchestrator<G> {
    gateway: Arc<G>,
    models: Vec<ModelName>,
}

impl<G> SubmissionOrchestrator<G>
where
    G: PredictionGateway + 'static,
{
    /// Orchestrator for the "Random Forest" and "Gradient Boosting" models.
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_models(gateway, default_models())
    }

    pub fn with_models(gateway: Arc<G>, models: Vec<ModelName>) -> Self {
        Self { gateway, models }
    }

    pub fn models(&self) -> &[ModelName] {
        &self.models
    }

    /// Validate, fan the payload out, aggregate, then persist.
    ///
    /// Nothing is written to `store` unless at least one model answered, and only after
    /// every call has settled. Resubmitting re-runs every model.
    pub async fn submit<S: KeyValueStore>(
        &self,
        answers: &AnswerSet,
        demographics: &DemographicRecord,
        store: &OutcomeStore<S>,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let payload = SubmissionPayload::build(answers, demographics).map_err(|problems| {
            warn!(%problems, "screening submission refused before dispatch");
            problems
        })?;

        let gateway = &self.gateway;
        let tasks = self.models.iter().map(|model| {
            let payload = payload.clone();
            (model.clone(), async move { gateway.predict(model, payload).await })
        });

        let settled = settle_all(tasks).await;
        for (model, error) in &settled.rejected {
            warn!(model = %model, %error, "prediction model failed");
        }

        let settled = settled.succeed_if_any().map_err(|rejected| {
            SubmissionError::AllModelsFailed {
                failures: rejected
                    .into_iter()
                    .map(|(model, error)| ModelFailure { model, error })
                    .collect(),
            }
        })?;

        let partial_results = settled.fulfilled.len() < self.models.len();
        let outcome = SubmissionOutcome {
            predictions: settled
                .fulfilled
                .into_iter()
                .map(|(_, prediction)| prediction)
                .collect(),
            answers: answers.clone(),
            demographics: demographics.clone(),
            timestamp: Utc::now(),
            partial_results,
        };

        store.save(&outcome)?;
        info!(
            predictions = outcome.predictions.len(),
            partial_results, "screening outcome stored"
        );
        Ok(outcome)
    }
}
