use serde::Serialize;

use super::domain::{
    AnswerSet, AnswerValue, DemographicField, DemographicRecord, SubmissionOutcome,
};
use super::gateway::PredictionGateway;
use super::orchestrator::{SubmissionError, SubmissionOrchestrator};
use super::outcome_store::OutcomeStore;
use super::questions::{Question, QUESTIONS, QUESTION_COUNT};
use crate::session::auth::{AuthGate, AuthStatus, LOGIN_ROUTE};
use crate::session::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardStep {
    Question { index: usize },
    Demographics,
    Submitted,
    /// Entered data is kept; the form can be edited and submitted again.
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryAction {
    Next,
    Continue,
    Submit,
}

/// Enabled state of the wizard buttons for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardControls {
    pub previous_enabled: bool,
    pub primary: Option<PrimaryAction>,
    pub primary_enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("sign in required (redirect to {redirect})")]
    Unauthenticated { redirect: &'static str },
    #[error("authentication has not resolved yet")]
    AuthPending,
    #[error("'{action}' is not available at this step")]
    InvalidTransition { action: &'static str },
    #[error("question {question_id} has not been answered")]
    Unanswered { question_id: &'static str },
    #[error("demographics incomplete: {}", join_fields(.missing))]
    DemographicsIncomplete { missing: Vec<DemographicField> },
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

fn join_fields(fields: &[DemographicField]) -> String {
    fields
        .iter()
        .map(|field| field.api_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Questionnaire, then demographics, then one submission.
///
/// Every transition re-checks the precondition that enables its control, so a disabled
/// button can never act. `submit` borrows the wizard mutably, which keeps a single
/// submission in flight.
#[derive(Debug, Clone)]
pub struct ScreeningWizard {
    step: WizardStep,
    answers: AnswerSet,
    demographics: DemographicRecord,
    outcome: Option<SubmissionOutcome>,
}

impl ScreeningWizard {
    /// Starts at the first question once the caller is known to be signed in.
    pub fn enter<A: AuthGate + ?Sized>(gate: &A) -> Result<Self, WizardError> {
        match gate.status() {
            AuthStatus::Authenticated => Ok(Self {
                step: WizardStep::Question { index: 0 },
                answers: AnswerSet::default(),
                demographics: DemographicRecord::default(),
                outcome: None,
            }),
            AuthStatus::Loading => Err(WizardError::AuthPending),
            AuthStatus::Anonymous => Err(WizardError::Unauthenticated {
                redirect: LOGIN_ROUTE,
            }),
        }
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn demographics(&self) -> &DemographicRecord {
        &self.demographics
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    pub fn current_question(&self) -> Option<&'static Question> {
        match self.step {
            WizardStep::Question { index } => QUESTIONS.get(index),
            _ => None,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        match self.step {
            WizardStep::Question { index } => (((index + 1) * 100) / QUESTION_COUNT) as u8,
            _ => 100,
        }
    }

    pub fn controls(&self) -> WizardControls {
        match &self.step {
            WizardStep::Question { index } => {
                let answered = self.answers.is_answered(QUESTIONS[*index].id);
                let primary = if *index + 1 < QUESTION_COUNT {
                    PrimaryAction::Next
                } else {
                    PrimaryAction::Continue
                };
                WizardControls {
                    previous_enabled: *index > 0,
                    primary: Some(primary),
                    primary_enabled: answered,
                }
            }
            WizardStep::Demographics | WizardStep::Failed { .. } => WizardControls {
                previous_enabled: true,
                primary: Some(PrimaryAction::Submit),
                primary_enabled: self.demographics.is_complete() && self.answers.is_complete(),
            },
            WizardStep::Submitted => WizardControls {
                previous_enabled: false,
                primary: None,
                primary_enabled: false,
            },
        }
    }

    pub fn can_advance(&self) -> bool {
        self.controls().primary_enabled
    }

    /// Record the answer for the question on screen. Re-answering overwrites.
    pub fn answer(&mut self, value: AnswerValue) -> Result<(), WizardError> {
        let question = self
            .current_question()
            .ok_or(WizardError::InvalidTransition { action: "answer" })?;
        self.answers
            .record(question.id, value)
            .map_err(|_| WizardError::InvalidTransition { action: "answer" })
    }

    pub fn next(&mut self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Question { index } if index + 1 < QUESTION_COUNT => {
                self.require_answered(index)?;
                self.step = WizardStep::Question { index: index + 1 };
                Ok(())
            }
            _ => Err(WizardError::InvalidTransition { action: "next" }),
        }
    }

    pub fn continue_to_demographics(&mut self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Question { index } if index + 1 == QUESTION_COUNT => {
                self.require_answered(index)?;
                self.step = WizardStep::Demographics;
                Ok(())
            }
            _ => Err(WizardError::InvalidTransition { action: "continue" }),
        }
    }

    /// Next on every question but the last, Continue on the last.
    pub fn advance(&mut self) -> Result<(), WizardError> {
        match self.controls().primary {
            Some(PrimaryAction::Next) => self.next(),
            Some(PrimaryAction::Continue) => self.continue_to_demographics(),
            _ => Err(WizardError::InvalidTransition { action: "advance" }),
        }
    }

    /// Back one step; answers already given are kept.
    pub fn previous(&mut self) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Question { index } if index > 0 => {
                self.step = WizardStep::Question { index: index - 1 };
                Ok(())
            }
            WizardStep::Demographics | WizardStep::Failed { .. } => {
                self.step = WizardStep::Question {
                    index: QUESTION_COUNT - 1,
                };
                Ok(())
            }
            _ => Err(WizardError::InvalidTransition { action: "previous" }),
        }
    }

    /// Editing after a failed attempt re-opens the form.
    pub fn set_demographic(
        &mut self,
        field: DemographicField,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        match self.step {
            WizardStep::Demographics | WizardStep::Failed { .. } => {
                self.demographics.set(field, value);
                self.step = WizardStep::Demographics;
                Ok(())
            }
            _ => Err(WizardError::InvalidTransition {
                action: "edit demographics",
            }),
        }
    }

    /// Submit from the demographics form (or retry after a failure).
    ///
    /// Incomplete demographics are refused without touching the network and without
    /// leaving the form. A submission error moves the wizard to `Failed` with the message.
    pub async fn submit<G, S>(
        &mut self,
        orchestrator: &SubmissionOrchestrator<G>,
        store: &OutcomeStore<S>,
    ) -> Result<&SubmissionOutcome, WizardError>
    where
        G: PredictionGateway + 'static,
        S: KeyValueStore,
    {
        if !matches!(
            self.step,
            WizardStep::Demographics | WizardStep::Failed { .. }
        ) {
            return Err(WizardError::InvalidTransition { action: "submit" });
        }

        let missing = self.demographics.missing_fields();
        if !missing.is_empty() {
            return Err(WizardError::DemographicsIncomplete { missing });
        }
        if let Some(question_id) = self.answers.unanswered().first() {
            return Err(WizardError::Unanswered {
                question_id: *question_id,
            });
        }

        match orchestrator
            .submit(&self.answers, &self.demographics, store)
            .await
        {
            Ok(outcome) => {
                self.step = WizardStep::Submitted;
                Ok(self.outcome.insert(outcome))
            }
            Err(err) => {
                self.step = WizardStep::Failed {
                    reason: err.to_string(),
                };
                Err(WizardError::Submission(err))
            }
        }
    }

    fn require_answered(&self, index: usize) -> Result<(), WizardError> {
        let question_id = QUESTIONS[index].id;
        if self.answers.is_answered(question_id) {
            Ok(())
        } else {
            Err(WizardError::Unanswered { question_id })
        }
    }
}
