use super::common::*;
use std::sync::Arc;

use crate::session::auth::AuthStatus;
use crate::workflows::screening::domain::{
    AnswerValue, DemographicField, GRADIENT_BOOSTING, RANDOM_FOREST,
};
use crate::workflows::screening::gateway::PredictionError;
use crate::workflows::screening::orchestrator::{SubmissionError, SubmissionOrchestrator};
use crate::workflows::screening::questions::QUESTION_COUNT;
use crate::workflows::screening::wizard::{
    PrimaryAction, ScreeningWizard, WizardError, WizardStep,
};

fn signed_in_wizard() -> ScreeningWizard {
    ScreeningWizard::enter(&AuthStatus::Authenticated).expect("signed in")
}

fn answer_all(wizard: &mut ScreeningWizard, value: AnswerValue) {
    for _ in 0..QUESTION_COUNT {
        wizard.answer(value).expect("question on screen");
        wizard.advance().expect("answered question advances");
    }
}

fn fill_demographics(wizard: &mut ScreeningWizard) {
    let record = demographics();
    for field in DemographicField::ordered() {
        wizard
            .set_demographic(field, record.get(field))
            .expect("form open");
    }
}

#[test]
fn entry_waits_for_auth_and_redirects_anonymous_users() {
    assert!(matches!(
        ScreeningWizard::enter(&AuthStatus::Loading),
        Err(WizardError::AuthPending)
    ));
    match ScreeningWizard::enter(&AuthStatus::Anonymous) {
        Err(WizardError::Unauthenticated { redirect }) => assert_eq!(redirect, "/auth"),
        other => panic!("expected redirect, got {other:?}"),
    }

    let wizard = signed_in_wizard();
    assert_eq!(wizard.step(), &WizardStep::Question { index: 0 });
    assert_eq!(wizard.progress_percent(), 10);
}

#[test]
fn next_is_disabled_until_the_question_is_answered() {
    let mut wizard = signed_in_wizard();
    let controls = wizard.controls();
    assert!(!controls.previous_enabled);
    assert_eq!(controls.primary, Some(PrimaryAction::Next));
    assert!(!controls.primary_enabled);
    assert!(matches!(
        wizard.next(),
        Err(WizardError::Unanswered {
            question_id: "A1_Score"
        })
    ));
    assert!(matches!(
        wizard.previous(),
        Err(WizardError::InvalidTransition { .. })
    ));

    wizard.answer(AnswerValue::Affirmative).expect("answer");
    assert!(wizard.can_advance());
    wizard.next().expect("advance");
    assert_eq!(wizard.step(), &WizardStep::Question { index: 1 });
    assert!(wizard.controls().previous_enabled);
}

#[test]
fn going_back_keeps_answers() {
    let mut wizard = signed_in_wizard();
    wizard.answer(AnswerValue::Affirmative).expect("answer");
    wizard.next().expect("advance");
    wizard.previous().expect("back");

    assert_eq!(wizard.step(), &WizardStep::Question { index: 0 });
    assert!(wizard.can_advance());
    assert_eq!(
        wizard.answers().get("A1_Score"),
        Some(AnswerValue::Affirmative)
    );
}

#[test]
fn last_question_continues_to_demographics() {
    let mut wizard = signed_in_wizard();
    for _ in 0..QUESTION_COUNT - 1 {
        wizard.answer(AnswerValue::Negative).expect("answer");
        wizard.next().expect("next");
    }
    assert_eq!(wizard.controls().primary, Some(PrimaryAction::Continue));
    assert!(wizard.next().is_err(), "no Next on the last question");

    wizard.answer(AnswerValue::Negative).expect("answer");
    wizard.continue_to_demographics().expect("continue");
    assert_eq!(wizard.step(), &WizardStep::Demographics);
    assert_eq!(wizard.progress_percent(), 100);

    let controls = wizard.controls();
    assert_eq!(controls.primary, Some(PrimaryAction::Submit));
    assert!(!controls.primary_enabled);
}

#[tokio::test]
async fn incomplete_form_cannot_submit() {
    let gateway = ScriptedGateway::default();
    let orchestrator = SubmissionOrchestrator::new(Arc::new(gateway.clone()));
    let (outcomes, _) = memory_outcomes();

    let mut wizard = signed_in_wizard();
    answer_all(&mut wizard, AnswerValue::Affirmative);
    fill_demographics(&mut wizard);
    wizard
        .set_demographic(DemographicField::Relation, "  ")
        .expect("form open");

    match wizard.submit(&orchestrator, &outcomes).await {
        Err(WizardError::DemographicsIncomplete { missing }) => {
            assert_eq!(missing, vec![DemographicField::Relation]);
        }
        other => panic!("expected incomplete form, got {other:?}"),
    }
    assert_eq!(wizard.step(), &WizardStep::Demographics);
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn failed_submission_keeps_data_and_can_be_retried() {
    let (outcomes, _) = memory_outcomes();
    let mut wizard = signed_in_wizard();
    answer_all(&mut wizard, AnswerValue::Affirmative);
    fill_demographics(&mut wizard);

    let unreachable = SubmissionOrchestrator::new(Arc::new(ScriptedGateway::default()));
    let err = wizard
        .submit(&unreachable, &outcomes)
        .await
        .expect_err("every model refuses");
    assert!(matches!(
        err,
        WizardError::Submission(SubmissionError::AllModelsFailed { .. })
    ));
    match wizard.step() {
        WizardStep::Failed { reason } => assert!(reason.contains("all prediction models failed")),
        other => panic!("expected failed step, got {other:?}"),
    }
    assert!(wizard.answers().is_complete());
    assert!(wizard.demographics().is_complete());
    assert!(wizard.can_advance(), "submit stays enabled for a retry");

    let recovering = SubmissionOrchestrator::new(Arc::new(ScriptedGateway::answering([
        (
            RANDOM_FOREST,
            Err(PredictionError::Transport("timeout".to_string())),
        ),
        (GRADIENT_BOOSTING, Ok(positive(GRADIENT_BOOSTING))),
    ])));
    let outcome = wizard
        .submit(&recovering, &outcomes)
        .await
        .expect("retry succeeds")
        .clone();

    assert_eq!(wizard.step(), &WizardStep::Submitted);
    assert!(outcome.partial_results);
    assert_eq!(wizard.outcome(), Some(&outcome));
    assert_eq!(outcomes.load().expect("readable"), Some(outcome));
    assert!(wizard.controls().primary.is_none());
}

#[test]
fn returning_to_questions_closes_the_form() {
    let mut wizard = signed_in_wizard();
    answer_all(&mut wizard, AnswerValue::Negative);
    fill_demographics(&mut wizard);
    wizard.previous().expect("back to questions");
    assert_eq!(
        wizard.step(),
        &WizardStep::Question {
            index: QUESTION_COUNT - 1
        }
    );
    assert!(wizard
        .set_demographic(DemographicField::Age, "7")
        .is_err());

    wizard.advance().expect("continue again");
    wizard
        .set_demographic(DemographicField::Age, "7")
        .expect("form open");
    assert_eq!(wizard.demographics().age, "7");
}
