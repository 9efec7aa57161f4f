use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::session::storage::{KeyValueStore, MemoryKeyValueStore, StorageError};
use crate::workflows::screening::domain::{
    AnswerSet, AnswerValue, DemographicRecord, ModelName, ModelPrediction, SubmissionPayload,
};
use crate::workflows::screening::gateway::{PredictionError, PredictionGateway};
use crate::workflows::screening::outcome_store::OutcomeStore;
use crate::workflows::screening::questions::QUESTIONS;

pub(super) fn demographics() -> DemographicRecord {
    DemographicRecord {
        age: "6".to_string(),
        gender: "f".to_string(),
        ethnicity: "South Asian".to_string(),
        jaundice: "no".to_string(),
        family_autism: "yes".to_string(),
        country_of_residence: "India".to_string(),
        used_app_before: "no".to_string(),
        age_bracket: "4-11 years".to_string(),
        relation: "Parent".to_string(),
    }
}

/// The first `affirmative` questions answered yes, the rest no.
pub(super) fn answers(affirmative: usize) -> AnswerSet {
    QUESTIONS
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let value = if index < affirmative {
                AnswerValue::Affirmative
            } else {
                AnswerValue::Negative
            };
            (question.id, value)
        })
        .collect()
}

pub(super) fn prediction(model: &str, result: Value, probability: f64) -> ModelPrediction {
    let name = ModelName::new(model);
    ModelPrediction {
        model_name: model.to_string(),
        model_key: name.key(),
        result: Some(result),
        prediction: None,
        probability: Some(probability),
        confidence: Some("high".to_string()),
    }
}

pub(super) fn positive(model: &str) -> ModelPrediction {
    prediction(model, json!(1), 0.92)
}

pub(super) fn negative(model: &str) -> ModelPrediction {
    prediction(model, json!(0), 0.12)
}

pub(super) fn memory_outcomes() -> (OutcomeStore<MemoryKeyValueStore>, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::default());
    (OutcomeStore::new(store.clone()), store)
}

/// Answers each model from a fixed script and records every dispatched call.
#[derive(Default, Clone)]
pub(super) struct ScriptedGateway {
    script: Arc<Mutex<HashMap<String, Result<ModelPrediction, PredictionError>>>>,
    calls: Arc<Mutex<Vec<(ModelName, SubmissionPayload)>>>,
}

impl ScriptedGateway {
    pub(super) fn answering(
        script: impl IntoIterator<Item = (&'static str, Result<ModelPrediction, PredictionError>)>,
    ) -> Self {
        let gateway = Self::default();
        {
            let mut guard = gateway.script.lock().expect("script mutex poisoned");
            for (model, response) in script {
                guard.insert(model.to_string(), response);
            }
        }
        gateway
    }

    pub(super) fn calls(&self) -> Vec<(ModelName, SubmissionPayload)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls mutex poisoned").len()
    }
}

#[async_trait]
impl PredictionGateway for ScriptedGateway {
    async fn predict(
        &self,
        model: &ModelName,
        payload: SubmissionPayload,
    ) -> Result<ModelPrediction, PredictionError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((model.clone(), payload));
        self.script
            .lock()
            .expect("script mutex poisoned")
            .get(model.as_str())
            .cloned()
            .unwrap_or_else(|| Err(PredictionError::Transport("connection refused".to_string())))
    }
}

/// Session store whose writes always fail.
#[derive(Default)]
pub(super) struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage quota exceeded".to_string()))
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn update_item(
        &self,
        _key: &str,
        _apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage quota exceeded".to_string()))
    }
}
