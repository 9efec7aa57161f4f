use crate::infra::SubmissionFile;
use asd_screening::config::{AppConfig, PredictionApiConfig};
use asd_screening::error::AppError;
use asd_screening::session::BrowserSession;
use asd_screening::telemetry;
use asd_screening::workflows::screening::{
    default_models, mock_prediction_router_for, AnswerValue, DemographicField,
    DemographicRecord, HttpPredictionClient, OutcomeStore, ResultsView, ScreeningWizard,
    SubmissionOrchestrator, QUESTION_COUNT,
};
use chrono::Local;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// How many of the ten questions are answered "yes" (from the first one on).
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub(crate) affirmative: u8,
    /// Take one model offline to show a partial result, e.g. "Random Forest".
    #[arg(long)]
    pub(crate) offline_model: Option<String>,
    /// Print the stored outcome as JSON instead of the results summary.
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            affirmative: 7,
            offline_model: None,
            json: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// JSON file with `answers` and `demographics`
    pub(crate) file: PathBuf,
    /// Override PREDICTION_API_URL for this run
    #[arg(long)]
    pub(crate) endpoint: Option<String>,
    /// Print the outcome as JSON instead of the results summary
    #[arg(long)]
    pub(crate) json: bool,
}

/// Walks the wizard end to end against a mock prediction API on a loopback port.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        affirmative,
        offline_model,
        json,
    } = args;

    let models: Vec<_> = default_models()
        .into_iter()
        .filter(|model| offline_model.as_deref() != Some(model.as_str()))
        .collect();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, mock_prediction_router_for(models)).await {
            tracing::error!(error = %err, "mock prediction API stopped");
        }
    });

    let config = PredictionApiConfig {
        base_url: PredictionApiConfig::parse_url(&format!("http://{addr}"))?,
        timeout: Some(Duration::from_secs(5)),
    };
    let orchestrator = SubmissionOrchestrator::new(Arc::new(HttpPredictionClient::new(&config)?));

    println!("ASD screening demo (mock models at {addr})");
    let session = BrowserSession::default();
    let mut login = BTreeMap::new();
    login.insert("fullName".to_string(), "Demo Parent".to_string());
    session.auth().login(login)?;

    let mut wizard = ScreeningWizard::enter(&session.auth())?;
    for index in 0..QUESTION_COUNT {
        let value = if index < usize::from(affirmative) {
            AnswerValue::Affirmative
        } else {
            AnswerValue::Negative
        };
        wizard.answer(value)?;
        wizard.advance()?;
    }

    let demographics = sample_demographics();
    for field in DemographicField::ordered() {
        wizard.set_demographic(field, demographics.get(field))?;
    }
    println!(
        "- {} questions answered, {} yes | demographics complete: {}",
        wizard.answers().len(),
        wizard.answers().affirmative_count(),
        wizard.demographics().is_complete()
    );

    let store = OutcomeStore::new(session.session.clone());
    wizard.submit(&orchestrator, &store).await?;

    let outcome = store.load()?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "outcome was not stored")
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_results(&ResultsView::from_outcome(&outcome)));
    }
    Ok(())
}

/// Submits a saved questionnaire to the configured prediction API.
pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs {
        file,
        endpoint,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(endpoint) = endpoint {
        config.prediction.base_url = PredictionApiConfig::parse_url(&endpoint)?;
    }
    telemetry::init(&config.telemetry)?;

    let request = SubmissionFile::read(&file)?
        .into_request()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let client = HttpPredictionClient::new(&config.prediction)?;
    let orchestrator = SubmissionOrchestrator::new(Arc::new(client));
    let store = OutcomeStore::new(BrowserSession::default().session);

    let outcome = orchestrator
        .submit(&request.answers, &request.demographics, &store)
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_results(&ResultsView::from_outcome(&outcome)));
    }
    Ok(())
}

pub(crate) fn sample_demographics() -> DemographicRecord {
    DemographicRecord {
        age: "6".to_string(),
        gender: "m".to_string(),
        ethnicity: "South Asian".to_string(),
        jaundice: "no".to_string(),
        family_autism: "no".to_string(),
        country_of_residence: "India".to_string(),
        used_app_before: "no".to_string(),
        age_bracket: "4-11 years".to_string(),
        relation: "Parent".to_string(),
    }
}

pub(crate) fn render_results(view: &ResultsView) -> String {
    let mut out = format!(
        "Screening results ({})\n",
        view.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    );
    for card in &view.cards {
        match &card.confidence {
            Some(confidence) => out.push_str(&format!(
                "- {}: {} | confidence {}\n",
                card.model_name, card.label, confidence
            )),
            None => out.push_str(&format!("- {}: {}\n", card.model_name, card.label)),
        }
    }
    if let Some(notice) = &view.notice {
        out.push_str(&format!("Note: {notice}\n"));
    }
    out
}
