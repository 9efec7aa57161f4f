use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::chat::{ChatError, ChatRepository, Participant, SenderRole};
use super::directory::{DoctorDirectory, ALL_SPECIALIZATIONS};
use crate::session::router::{authenticated_session, internal_error, session_id};
use crate::session::{BrowserSession, MemoryKeyValueStore, SessionRegistry};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenConversationRequest {
    pub doctor_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub struct ConsultService {
    directory: DoctorDirectory,
    sessions: Arc<SessionRegistry>,
}

impl ConsultService {
    pub fn new(directory: DoctorDirectory, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            directory,
            sessions,
        }
    }

    pub fn directory(&self) -> &DoctorDirectory {
        &self.directory
    }
}

/// Router builder exposing the doctor directory and patient conversations.
pub fn consult_router(service: Arc<ConsultService>) -> Router {
    Router::new()
        .route("/api/v1/doctors", get(doctors_handler))
        .route(
            "/api/v1/conversations",
            get(conversations_handler).post(open_conversation_handler),
        )
        .route(
            "/api/v1/conversations/:conversation_id/messages",
            post(send_message_handler),
        )
        .with_state(service)
}

pub(crate) async fn doctors_handler(
    State(service): State<Arc<ConsultService>>,
    Query(query): Query<DoctorQuery>,
) -> Response {
    let specialization = query
        .specialization
        .as_deref()
        .unwrap_or(ALL_SPECIALIZATIONS);
    let doctors = service.directory.search(&query.q, specialization);
    (StatusCode::OK, Json(json!({ "doctors": doctors }))).into_response()
}

pub(crate) async fn conversations_handler(
    State(service): State<Arc<ConsultService>>,
    headers: HeaderMap,
) -> Response {
    let session = match authenticated_session(&service.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match chats(&session).conversations() {
        Ok(conversations) => {
            (StatusCode::OK, Json(json!({ "conversations": conversations }))).into_response()
        }
        Err(err) => chat_error(err),
    }
}

pub(crate) async fn open_conversation_handler(
    State(service): State<Arc<ConsultService>>,
    headers: HeaderMap,
    Json(request): Json<OpenConversationRequest>,
) -> Response {
    let session = match authenticated_session(&service.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let Some(doctor) = service.directory.get(request.doctor_id) else {
        let payload = json!({ "error": format!("doctor {} not found", request.doctor_id) });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    };
    let patient = match patient(&session, &headers) {
        Ok(patient) => patient,
        Err(err) => return chat_error(err),
    };

    let doctor = Participant::new(doctor.id.to_string(), doctor.name.clone());
    match chats(&session).open_conversation(&patient, &doctor) {
        Ok(conversation) => (StatusCode::OK, Json(conversation)).into_response(),
        Err(err) => chat_error(err),
    }
}

pub(crate) async fn send_message_handler(
    State(service): State<Arc<ConsultService>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Response {
    let session = match authenticated_session(&service.sessions, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let patient = match patient(&session, &headers) {
        Ok(patient) => patient,
        Err(err) => return chat_error(err),
    };

    match chats(&session).send_message(
        &conversation_id,
        &patient,
        SenderRole::Patient,
        &request.text,
    ) {
        Ok(Some(message)) => (StatusCode::CREATED, Json(message)).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => chat_error(err),
    }
}

fn chats(session: &BrowserSession) -> ChatRepository<MemoryKeyValueStore> {
    ChatRepository::new(session.local.clone())
}

/// The signed-in patient, identified by session id and named from the login record.
fn patient(session: &BrowserSession, headers: &HeaderMap) -> Result<Participant, ChatError> {
    let record = session.auth().current()?;
    let name = record
        .as_ref()
        .and_then(|record| record.display_name())
        .unwrap_or("Patient")
        .to_string();
    let id = session_id(headers).map(|id| id.0).unwrap_or_default();
    Ok(Participant::new(id, name))
}

fn chat_error(err: ChatError) -> Response {
    match err {
        ChatError::ConversationNotFound(id) => {
            let payload = json!({ "error": format!("conversation {id} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        ChatError::Storage(err) => internal_error(err.to_string()),
    }
}
