//! ASD screening submission: the question wizard, the concurrent two-model fan-out, the
//! persisted outcome, and the results classification read back from it.

pub mod client;
pub mod domain;
pub mod fanout;
pub mod gateway;
pub mod mock_api;
pub mod orchestrator;
pub mod outcome_store;
pub mod questions;
pub mod results;
pub mod router;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use client::{ClientBuildError, HttpPredictionClient};
pub use domain::{
    default_models, parse_age, AnswerSet, AnswerValue, DemographicField, DemographicRecord,
    IncompleteInput, ModelName, ModelPrediction, PredictionResponse, SubmissionOutcome,
    SubmissionPayload, GRADIENT_BOOSTING, RANDOM_FOREST,
};
pub use fanout::{settle_all, Settled};
pub use gateway::{PredictionError, PredictionGateway};
pub use mock_api::{mock_prediction_router, mock_prediction_router_for};
pub use orchestrator::{ModelFailure, SubmissionError, SubmissionOrchestrator};
pub use outcome_store::{OutcomeStore, SCREENING_RESULTS_KEY};
pub use questions::{Question, QUESTIONS, QUESTION_COUNT};
pub use results::{classify, confidence_text, ModelResultCard, ResultCategory, ResultsView};
pub use router::{screening_router, ScreeningService, SubmissionRequest};
pub use wizard::{PrimaryAction, ScreeningWizard, WizardControls, WizardError, WizardStep};
