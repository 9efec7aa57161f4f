use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::questions::{self, QUESTIONS};

pub const RANDOM_FOREST: &str = "Random Forest";
pub const GRADIENT_BOOSTING: &str = "Gradient Boosting";

/// Binary answer to a screening question; travels as `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AnswerValue {
    Affirmative,
    Negative,
}

impl AnswerValue {
    pub const fn score(self) -> u8 {
        match self {
            Self::Affirmative => 1,
            Self::Negative => 0,
        }
    }

    /// Accepts the radio labels used by the questionnaire ("yes" / "no").
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" => Some(Self::Affirmative),
            "no" | "0" => Some(Self::Negative),
            _ => None,
        }
    }
}

impl From<AnswerValue> for u8 {
    fn from(value: AnswerValue) -> Self {
        value.score()
    }
}

impl TryFrom<u8> for AnswerValue {
    type Error = InvalidAnswer;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Affirmative),
            0 => Ok(Self::Negative),
            other => Err(InvalidAnswer(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("answer must be 0 or 1, got {0}")]
pub struct InvalidAnswer(pub u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a screening question")]
pub struct UnknownQuestion(pub String);

/// Answers keyed by question id. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerValue>);

impl AnswerSet {
    pub fn record(&mut self, question_id: &str, value: AnswerValue) -> Result<(), UnknownQuestion> {
        let question =
            questions::find(question_id).ok_or_else(|| UnknownQuestion(question_id.to_string()))?;
        self.0.insert(question.id.to_string(), value);
        Ok(())
    }

    pub fn get(&self, question_id: &str) -> Option<AnswerValue> {
        self.0.get(question_id).copied()
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    /// Catalog ids without an answer, in catalog order.
    pub fn unanswered(&self) -> Vec<&'static str> {
        QUESTIONS
            .iter()
            .filter(|question| !self.is_answered(question.id))
            .map(|question| question.id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unanswered().is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn affirmative_count(&self) -> usize {
        self.0
            .values()
            .filter(|value| **value == AnswerValue::Affirmative)
            .count()
    }
}

impl<'a> FromIterator<(&'a str, AnswerValue)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (&'a str, AnswerValue)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, value)| (id.to_string(), value))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicField {
    Age,
    Gender,
    Ethnicity,
    Jaundice,
    FamilyAutism,
    CountryOfResidence,
    UsedAppBefore,
    AgeBracket,
    Relation,
}

impl DemographicField {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::Age,
            Self::Gender,
            Self::Ethnicity,
            Self::Jaundice,
            Self::FamilyAutism,
            Self::CountryOfResidence,
            Self::UsedAppBefore,
            Self::AgeBracket,
            Self::Relation,
        ]
    }

    /// Field name in the external prediction schema, misspellings included.
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Ethnicity => "ethnicity",
            Self::Jaundice => "jundice",
            Self::FamilyAutism => "austim",
            Self::CountryOfResidence => "contry_of_res",
            Self::UsedAppBefore => "used_app_before",
            Self::AgeBracket => "age_desc",
            Self::Relation => "relation",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::Ethnicity => "Ethnicity",
            Self::Jaundice => "Born with jaundice",
            Self::FamilyAutism => "Family member with autism",
            Self::CountryOfResidence => "Country of residence",
            Self::UsedAppBefore => "Used a screening app before",
            Self::AgeBracket => "Age bracket",
            Self::Relation => "Relation to subject",
        }
    }
}

impl fmt::Display for DemographicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Demographics form. Every field is kept as entered; `age` is converted on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicRecord {
    pub age: String,
    pub gender: String,
    pub ethnicity: String,
    #[serde(rename = "jundice")]
    pub jaundice: String,
    #[serde(rename = "austim")]
    pub family_autism: String,
    #[serde(rename = "contry_of_res")]
    pub country_of_residence: String,
    pub used_app_before: String,
    #[serde(rename = "age_desc")]
    pub age_bracket: String,
    pub relation: String,
}

impl DemographicRecord {
    pub fn get(&self, field: DemographicField) -> &str {
        match field {
            DemographicField::Age => &self.age,
            DemographicField::Gender => &self.gender,
            DemographicField::Ethnicity => &self.ethnicity,
            DemographicField::Jaundice => &self.jaundice,
            DemographicField::FamilyAutism => &self.family_autism,
            DemographicField::CountryOfResidence => &self.country_of_residence,
            DemographicField::UsedAppBefore => &self.used_app_before,
            DemographicField::AgeBracket => &self.age_bracket,
            DemographicField::Relation => &self.relation,
        }
    }

    pub fn set(&mut self, field: DemographicField, value: impl Into<String>) {
        let slot = match field {
            DemographicField::Age => &mut self.age,
            DemographicField::Gender => &mut self.gender,
            DemographicField::Ethnicity => &mut self.ethnicity,
            DemographicField::Jaundice => &mut self.jaundice,
            DemographicField::FamilyAutism => &mut self.family_autism,
            DemographicField::CountryOfResidence => &mut self.country_of_residence,
            DemographicField::UsedAppBefore => &mut self.used_app_before,
            DemographicField::AgeBracket => &mut self.age_bracket,
            DemographicField::Relation => &mut self.relation,
        };
        *slot = value.into();
    }

    /// Whitespace-only values count as missing.
    pub fn missing_fields(&self) -> Vec<DemographicField> {
        DemographicField::ordered()
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Integer part of the entered age; fractional input is truncated.
pub fn parse_age(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(age) = trimmed.parse::<u32>() {
        return Some(age);
    }
    match trimmed.parse::<f64>() {
        Ok(age) if age.is_finite() && age >= 0.0 && age <= f64::from(u32::MAX) => {
            Some(age.trunc() as u32)
        }
        _ => None,
    }
}

/// Why a submission was refused before any model was called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncompleteInput {
    pub missing_fields: Vec<DemographicField>,
    pub unanswered_questions: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_age: Option<String>,
}

impl IncompleteInput {
    pub fn is_empty(&self) -> bool {
        self.missing_fields.is_empty()
            && self.unanswered_questions.is_empty()
            && self.invalid_age.is_none()
    }
}

impl fmt::Display for IncompleteInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing_fields.is_empty() {
            let names: Vec<&str> = self.missing_fields.iter().map(|f| f.api_name()).collect();
            parts.push(format!("missing demographics: {}", names.join(", ")));
        }
        if !self.unanswered_questions.is_empty() {
            parts.push(format!(
                "unanswered questions: {}",
                self.unanswered_questions.join(", ")
            ));
        }
        if let Some(age) = &self.invalid_age {
            parts.push(format!("age '{age}' is not a number"));
        }
        write!(f, "incomplete screening input ({})", parts.join("; "))
    }
}

impl std::error::Error for IncompleteInput {}

/// The exact body posted to every prediction model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(flatten)]
    pub scores: BTreeMap<String, u8>,
    pub age: u32,
    pub gender: String,
    pub ethnicity: String,
    pub jundice: String,
    pub austim: String,
    pub contry_of_res: String,
    pub used_app_before: String,
    pub age_desc: String,
    pub relation: String,
}

impl SubmissionPayload {
    pub fn build(
        answers: &AnswerSet,
        demographics: &DemographicRecord,
    ) -> Result<Self, IncompleteInput> {
        let mut problems = IncompleteInput {
            missing_fields: demographics.missing_fields(),
            unanswered_questions: answers.unanswered(),
            invalid_age: None,
        };

        let age = if problems.missing_fields.contains(&DemographicField::Age) {
            None
        } else {
            let parsed = parse_age(&demographics.age);
            if parsed.is_none() {
                problems.invalid_age = Some(demographics.age.clone());
            }
            parsed
        };

        match age {
            Some(age) if problems.is_empty() => {
                let scores = QUESTIONS
                    .iter()
                    .filter_map(|question| {
                        answers
                            .get(question.id)
                            .map(|value| (question.id.to_string(), value.score()))
                    })
                    .collect();

                Ok(Self {
                    scores,
                    age,
                    gender: demographics.gender.clone(),
                    ethnicity: demographics.ethnicity.clone(),
                    jundice: demographics.jaundice.clone(),
                    austim: demographics.family_autism.clone(),
                    contry_of_res: demographics.country_of_residence.clone(),
                    used_app_before: demographics.used_app_before.clone(),
                    age_desc: demographics.age_bracket.clone(),
                    relation: demographics.relation.clone(),
                })
            }
            _ => Err(problems),
        }
    }

    pub fn score_total(&self) -> u32 {
        self.scores.values().map(|score| u32::from(*score)).sum()
    }
}

/// Display name of an external model, e.g. "Random Forest".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased with spaces replaced by underscores: "Random Forest" -> "random_forest".
    pub fn key(&self) -> String {
        self.0.to_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn default_models() -> Vec<ModelName> {
    vec![
        ModelName::new(RANDOM_FOREST),
        ModelName::new(GRADIENT_BOOSTING),
    ]
}

/// Success body returned by a prediction model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub prediction: Option<Value>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub confidence: Option<String>,
}

impl PredictionResponse {
    pub fn into_prediction(self, model: &ModelName) -> Result<ModelPrediction, String> {
        if self.result.is_none() && self.prediction.is_none() {
            return Err("response carries neither 'result' nor 'prediction'".to_string());
        }
        if let Some(probability) = self.probability {
            if !(0.0..=1.0).contains(&probability) {
                return Err(format!("probability {probability} is outside 0..1"));
            }
        }

        Ok(ModelPrediction {
            model_name: model.as_str().to_string(),
            model_key: model.key(),
            result: self.result,
            prediction: self.prediction,
            probability: self.probability,
            confidence: self.confidence,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPrediction {
    pub model_name: String,
    pub model_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl ModelPrediction {
    /// `result`, falling back to `prediction` when `result` is missing or falsy.
    pub fn indicator(&self) -> Option<&Value> {
        match &self.result {
            Some(value) if is_truthy(value) => Some(value),
            _ => self.prediction.as_ref().or(self.result.as_ref()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Aggregated result of one submission, overwritten by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub predictions: Vec<ModelPrediction>,
    pub answers: AnswerSet,
    pub demographics: DemographicRecord,
    pub timestamp: DateTime<Utc>,
    pub partial_results: bool,
}

impl SubmissionOutcome {
    pub fn prediction_for(&self, model_key: &str) -> Option<&ModelPrediction> {
        self.predictions
            .iter()
            .find(|prediction| prediction.model_key == model_key)
    }
}
