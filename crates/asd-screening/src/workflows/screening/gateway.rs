use std::sync::Arc;

use async_trait::async_trait;

use super::domain::{ModelName, ModelPrediction, SubmissionPayload};

/// Per-model failure. None of these abort sibling calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Transport(String),
    #[error("prediction service answered {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("prediction response unreadable: {0}")]
    Malformed(String),
}

/// Seam in front of the external prediction API.
#[async_trait]
pub trait PredictionGateway: Send + Sync {
    async fn predict(
        &self,
        model: &ModelName,
        payload: SubmissionPayload,
    ) -> Result<ModelPrediction, PredictionError>;
}

#[async_trait]
impl<G> PredictionGateway for Arc<G>
where
    G: PredictionGateway + ?Sized,
{
    async fn predict(
        &self,
        model: &ModelName,
        payload: SubmissionPayload,
    ) -> Result<ModelPrediction, PredictionError> {
        self.as_ref().predict(model, payload).await
    }
}
