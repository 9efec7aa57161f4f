//! Stand-in for the external prediction API, for local runs and loopback tests.
//!
//! Scores are not a model: the probability is the share of affirmative answers and the
//! verdict flips to "YES" at six or more.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::debug;

use super::domain::{default_models, ModelName, SubmissionPayload};
use super::questions::QUESTIONS;

const POSITIVE_THRESHOLD: u32 = 6;

#[derive(Debug)]
struct MockModels {
    models: Vec<ModelName>,
}

pub fn mock_prediction_router() -> Router {
    mock_prediction_router_for(default_models())
}

/// Only the listed models answer; any other name gets a 404.
pub fn mock_prediction_router_for(models: Vec<ModelName>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/predict/:model", post(predict_handler))
        .with_state(Arc::new(MockModels { models }))
}

async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "ASD Screening API is running" }))
}

async fn predict_handler(
    State(state): State<Arc<MockModels>>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !state.models.iter().any(|known| known.as_str() == model) {
        let payload = json!({ "detail": format!("Unknown model '{model}'") });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    }

    let payload: SubmissionPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(err) => return unprocessable(err.to_string()),
    };
    if let Some(question) = QUESTIONS
        .iter()
        .find(|question| !matches!(payload.scores.get(question.id), Some(0 | 1)))
    {
        return unprocessable(format!("{} must be 0 or 1", question.id));
    }

    let total = payload.score_total();
    let probability = f64::from(total) / QUESTIONS.len() as f64;
    let confidence = if probability >= 0.8 || probability <= 0.2 {
        "high"
    } else {
        "moderate"
    };
    debug!(model = %model, total, "mock prediction served");

    let prediction = if total >= POSITIVE_THRESHOLD { "YES" } else { "NO" };
    Json(json!({
        "prediction": prediction,
        "probability": probability,
        "confidence": confidence,
    }))
    .into_response()
}

fn unprocessable(detail: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn body_with_scores(affirmative: usize) -> Value {
        let mut body = json!({
            "age": 6,
            "gender": "m",
            "ethnicity": "Asian",
            "jundice": "no",
            "austim": "no",
            "contry_of_res": "India",
            "used_app_before": "no",
            "age_desc": "4-11 years",
            "relation": "Parent",
        });
        for (index, question) in QUESTIONS.iter().enumerate() {
            body[question.id] = json!(u8::from(index < affirmative));
        }
        body
    }

    async fn post(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn scores_above_threshold_predict_yes() {
        let (status, body) = post(
            mock_prediction_router(),
            "/predict/Random%20Forest",
            body_with_scores(9),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "YES");
        assert_eq!(body["probability"], json!(0.9));
        assert_eq!(body["confidence"], "high");
    }

    #[tokio::test]
    async fn low_scores_predict_no() {
        let (status, body) = post(
            mock_prediction_router(),
            "/predict/Gradient%20Boosting",
            body_with_scores(4),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "NO");
        assert_eq!(body["confidence"], "moderate");
    }

    #[tokio::test]
    async fn unknown_model_is_not_found() {
        let router = mock_prediction_router_for(vec![ModelName::new("Random Forest")]);
        let (status, body) = post(router, "/predict/Gradient%20Boosting", body_with_scores(1)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("Gradient Boosting"));
    }

    #[tokio::test]
    async fn missing_scores_are_unprocessable() {
        let mut body = body_with_scores(3);
        body.as_object_mut().unwrap().remove("A7_Score");
        let (status, body) = post(mock_prediction_router(), "/predict/Random%20Forest", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "A7_Score must be 0 or 1");
    }
}
