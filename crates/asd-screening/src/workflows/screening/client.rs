//! reqwest-backed client for the external prediction API.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use super::domain::{ModelName, ModelPrediction, PredictionResponse, SubmissionPayload};
use super::gateway::{PredictionError, PredictionGateway};
use crate::config::PredictionApiConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("failed to build prediction HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Posts payloads to `<base>/predict/{model}`.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionApiConfig) -> Result<Self, ClientBuildError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Model names are escaped as a single path segment ("Random Forest" -> "Random%20Forest").
    pub fn endpoint(&self, model: &ModelName) -> Result<Url, PredictionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PredictionError::Transport(format!("{} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push("predict")
            .push(model.as_str());
        Ok(url)
    }
}

#[async_trait]
impl PredictionGateway for HttpPredictionClient {
    async fn predict(
        &self,
        model: &ModelName,
        payload: SubmissionPayload,
    ) -> Result<ModelPrediction, PredictionError> {
        let url = self.endpoint(model)?;
        debug!(model = %model, url = %url, "dispatching prediction request");

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| PredictionError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| PredictionError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(PredictionError::Rejected {
                status: status.as_u16(),
                detail: error_detail(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        let parsed: PredictionResponse = serde_json::from_str(&body)
            .map_err(|err| PredictionError::Malformed(err.to_string()))?;
        let prediction = parsed
            .into_prediction(model)
            .map_err(PredictionError::Malformed)?;

        info!(model = %model, probability = ?prediction.probability, "prediction received");
        Ok(prediction)
    }
}

/// Pulls a readable reason out of an error body (`detail` or `error`), else the raw text.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            let field = map.get("detail").or_else(|| map.get("error"));
            match field {
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
                None => Some(trimmed.to_string()),
            }
        }
        _ => Some(trimmed.to_string()),
    }
}
