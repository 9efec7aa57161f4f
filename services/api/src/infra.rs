use asd_screening::workflows::screening::{
    AnswerSet, AnswerValue, DemographicRecord, SubmissionRequest,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// An answer as written in a submission file: `1`/`0` or `"yes"`/`"no"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerInput {
    Score(u8),
    Label(String),
}

impl AnswerInput {
    fn value(&self) -> Result<AnswerValue, String> {
        match self {
            AnswerInput::Score(score) => {
                AnswerValue::try_from(*score).map_err(|err| err.to_string())
            }
            AnswerInput::Label(label) => AnswerValue::from_label(label)
                .ok_or_else(|| format!("'{label}' is not a yes/no answer")),
        }
    }
}

/// JSON document accepted by the `submit` command.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmissionFile {
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, AnswerInput>,
    #[serde(default)]
    pub(crate) demographics: DemographicRecord,
}

impl SubmissionFile {
    pub(crate) fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub(crate) fn read(path: &Path) -> Result<Self, std::io::Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    /// Checks every answer before handing the request to the orchestrator.
    pub(crate) fn into_request(self) -> Result<SubmissionRequest, String> {
        let mut answers = AnswerSet::default();
        for (question_id, input) in &self.answers {
            let value = input
                .value()
                .map_err(|err| format!("{question_id}: {err}"))?;
            answers.record(question_id, value).map_err(|err| err.to_string())?;
        }

        Ok(SubmissionRequest {
            answers,
            demographics: self.demographics,
        })
    }
}
