use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::auth::{AuthGate, AuthStatus, LOGIN_ROUTE};
use super::registry::{BrowserSession, SessionId, SessionRegistry, SESSION_HEADER};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Login and logout endpoints; both work on the registry shared with the workflow routers.
pub fn auth_router(sessions: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/logout", post(logout_handler))
        .with_state(sessions)
}

pub(crate) async fn login_handler(
    State(sessions): State<Arc<SessionRegistry>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let full_name = request.full_name.trim();
    if full_name.is_empty() {
        let payload = json!({ "error": "full_name is required" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }

    let mut data = BTreeMap::new();
    data.insert("fullName".to_string(), full_name.to_string());
    if let Some(email) = request.email.filter(|email| !email.trim().is_empty()) {
        data.insert("email".to_string(), email);
    }

    let (id, session) = sessions.open();
    match session.auth().login(data) {
        Ok(_) => {
            info!(session = %id.0, "patient signed in");
            (StatusCode::OK, Json(json!({ "session_id": id.0 }))).into_response()
        }
        Err(err) => {
            sessions.close(&id);
            internal_error(err.to_string())
        }
    }
}

pub(crate) async fn logout_handler(
    State(sessions): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return unauthorized();
    };
    let Some(session) = sessions.close(&id) else {
        return unauthorized();
    };

    match session.auth().logout() {
        Ok(()) => {
            info!(session = %id.0, "patient signed out");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => internal_error(err.to_string()),
    }
}

pub fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| SessionId(value.to_string()))
}

/// Resolves the caller's session and requires a signed-in patient.
///
/// The `Err` side is the finished 401 response carrying the login redirect.
pub fn authenticated_session(
    sessions: &SessionRegistry,
    headers: &HeaderMap,
) -> Result<Arc<BrowserSession>, Response> {
    let session = session_id(headers)
        .and_then(|id| sessions.get(&id))
        .ok_or_else(unauthorized)?;

    match session.auth().status() {
        AuthStatus::Authenticated => Ok(session),
        AuthStatus::Loading | AuthStatus::Anonymous => Err(unauthorized()),
    }
}

pub(crate) fn unauthorized() -> Response {
    let payload = json!({
        "error": "sign in required",
        "redirect": LOGIN_ROUTE,
    });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) fn internal_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
