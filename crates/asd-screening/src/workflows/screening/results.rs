use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::domain::{default_models, ModelName, ModelPrediction, SubmissionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCategory {
    LikelyPositive,
    LikelyNegative,
    NoData,
}

impl ResultCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LikelyPositive => "Likely Positive",
            Self::LikelyNegative => "Likely Negative",
            Self::NoData => "No Data",
        }
    }
}

/// Exact membership test, not a threshold: `1`, `"1"`, `true`, `"positive"`, `"YES"`.
/// Matching is case-sensitive; every other value, absence included, is negative.
pub fn is_positive_indicator(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(number)) => number.as_f64() == Some(1.0),
        Some(Value::String(text)) => matches!(text.as_str(), "1" | "positive" | "YES"),
        Some(Value::Bool(flag)) => *flag,
        _ => false,
    }
}

pub fn classify(prediction: Option<&ModelPrediction>) -> ResultCategory {
    match prediction {
        None => ResultCategory::NoData,
        Some(prediction) if is_positive_indicator(prediction.indicator()) => {
            ResultCategory::LikelyPositive
        }
        Some(_) => ResultCategory::LikelyNegative,
    }
}

/// "92% (high)"; a missing or zero probability reads "N/A".
pub fn confidence_text(prediction: &ModelPrediction) -> String {
    let share = match prediction.probability {
        Some(probability) if probability != 0.0 => {
            format!("{}%", (probability * 100.0).round() as i64)
        }
        _ => "N/A".to_string(),
    };
    match &prediction.confidence {
        Some(label) => format!("{share} ({label})"),
        None => share,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResultCard {
    pub model_name: String,
    pub model_key: String,
    pub category: ResultCategory,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl ModelResultCard {
    fn build(model: &ModelName, prediction: Option<&ModelPrediction>) -> Self {
        let category = classify(prediction);
        Self {
            model_name: model.as_str().to_string(),
            model_key: model.key(),
            category,
            label: category.label(),
            confidence: prediction.map(confidence_text),
        }
    }
}

/// What the results page shows for the stored outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub cards: Vec<ModelResultCard>,
    pub partial_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResultsView {
    pub fn from_outcome(outcome: &SubmissionOutcome) -> Self {
        Self::for_models(outcome, &default_models())
    }

    /// One card per expected model, looked up by key; missing predictions become "No Data".
    pub fn for_models(outcome: &SubmissionOutcome, models: &[ModelName]) -> Self {
        let cards = models
            .iter()
            .map(|model| ModelResultCard::build(model, outcome.prediction_for(&model.key())))
            .collect();

        let notice = if outcome.partial_results {
            Some(match outcome.predictions.len() {
                1 => "Only one model responded".to_string(),
                answered => format!("Only {answered} of {} models responded", models.len()),
            })
        } else {
            None
        };

        Self {
            cards,
            partial_results: outcome.partial_results,
            notice,
            timestamp: outcome.timestamp,
        }
    }

    pub fn card(&self, model_key: &str) -> Option<&ModelResultCard> {
        self.cards.iter().find(|card| card.model_key == model_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::screening::domain::{
        AnswerSet, DemographicRecord, GRADIENT_BOOSTING, RANDOM_FOREST,
    };
    use serde_json::json;

    fn prediction(model: &str, result: Value) -> ModelPrediction {
        let name = ModelName::new(model);
        ModelPrediction {
            model_name: model.to_string(),
            model_key: name.key(),
            result: Some(result),
            prediction: None,
            probability: Some(0.92),
            confidence: Some("high".to_string()),
        }
    }

    #[test]
    fn positive_values_are_an_exact_set() {
        for value in [json!(1), json!("1"), json!(true), json!("positive"), json!("YES")] {
            assert!(is_positive_indicator(Some(&value)), "{value} is positive");
        }
        for value in [
            json!(0),
            json!("no"),
            json!("Positive"),
            json!("yes"),
            json!(-1),
            json!(2),
            json!(false),
            json!(null),
            json!({}),
        ] {
            assert!(!is_positive_indicator(Some(&value)), "{value} is negative");
        }
        assert!(!is_positive_indicator(None));
    }

    #[test]
    fn classification_reads_prediction_field_when_result_missing() {
        let mut from_api = prediction(RANDOM_FOREST, json!(null));
        from_api.result = None;
        from_api.prediction = Some(json!("YES"));
        assert_eq!(classify(Some(&from_api)), ResultCategory::LikelyPositive);

        from_api.prediction = Some(json!("NO"));
        assert_eq!(classify(Some(&from_api)), ResultCategory::LikelyNegative);
        assert_eq!(classify(None), ResultCategory::NoData);
    }

    #[test]
    fn confidence_text_formats_probability() {
        let mut card = prediction(RANDOM_FOREST, json!(1));
        assert_eq!(confidence_text(&card), "92% (high)");
        card.probability = None;
        card.confidence = None;
        assert_eq!(confidence_text(&card), "N/A");
        card.probability = Some(0.0);
        assert_eq!(confidence_text(&card), "N/A");
    }

    #[test]
    fn missing_model_renders_no_data_with_notice() {
        let outcome = SubmissionOutcome {
            predictions: vec![prediction(GRADIENT_BOOSTING, json!(0))],
            answers: AnswerSet::default(),
            demographics: DemographicRecord::default(),
            timestamp: Utc::now(),
            partial_results: true,
        };

        let view = ResultsView::from_outcome(&outcome);
        assert_eq!(view.cards.len(), 2);
        let forest = view.card("random_forest").expect("card present");
        assert_eq!(forest.category, ResultCategory::NoData);
        assert_eq!(forest.label, "No Data");
        assert!(forest.confidence.is_none());
        let boosting = view.card("gradient_boosting").expect("card present");
        assert_eq!(boosting.label, "Likely Negative");
        assert_eq!(view.notice.as_deref(), Some("Only one model responded"));
    }
}
