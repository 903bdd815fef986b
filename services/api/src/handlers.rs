//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for learner sessions.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use mastery_core::{LearningPath, orchestrator::SubmitError};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        CreateSessionPayload, ErrorResponse, SessionSummary, SessionView, SubmitAnswersPayload,
    },
    sessions::LearnerSession,
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn user_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("x-user-id header is required".to_string()))
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Session with id '{}' not found", id))
}

/// Start a new learning path session.
///
/// The first checkpoint is gathered and its questions are generated before
/// the response is returned.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = SessionView),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user creating the session")
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;

    let start_at = payload.start_at.unwrap_or(0);
    if start_at >= state.catalog.len() {
        return Err(ApiError::BadRequest(format!(
            "start_at must be below {}",
            state.catalog.len()
        )));
    }

    let path = LearningPath::start_at(state.catalog.as_ref().clone(), start_at);
    let mut session = LearnerSession::new(user_id, path);
    info!(session_id = %session.id, user_id, start_at, "Creating session");
    session.advance(&state.tutor).await;

    let view = session.view();
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// List all sessions for a user.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [SessionSummary]),
        (status = 400, description = "Bad request", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let user_id = user_id(&headers)?;

    let mut summaries = Vec::new();
    for session in state.sessions.list(user_id).await {
        summaries.push(session.lock().await.summary());
    }
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(summaries))
}

/// Get a specific session by its ID.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;

    let session = state
        .sessions
        .get(id, user_id)
        .await
        .ok_or_else(|| not_found(id))?;

    let view = session.lock().await.view();
    Ok((StatusCode::OK, Json(view)))
}

/// Delete a session and free its in-memory state.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = user_id(&headers)?;

    if !state.sessions.remove(id, user_id).await {
        return Err(not_found(id));
    }
    info!(session_id = %id, user_id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Submit answers for the staged questions and grade them.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    request_body = SubmitAnswersPayload,
    responses(
        (status = 200, description = "Answers graded", body = SessionView),
        (status = 400, description = "Blank answers", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "No questions are waiting for answers", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn submit_answers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswersPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;

    let session = state
        .sessions
        .get(id, user_id)
        .await
        .ok_or_else(|| not_found(id))?;
    let mut session = session.lock().await;

    session
        .submit_answers(&payload.answers)
        .map_err(|e| match e {
            SubmitError::Blank => ApiError::BadRequest(e.to_string()),
            SubmitError::NotAwaiting => ApiError::Conflict(e.to_string()),
        })?;
    let step = session.advance(&state.tutor).await;
    info!(session_id = %id, ?step, "Answers graded");

    Ok((StatusCode::OK, Json(session.view())))
}

/// Move on to the next checkpoint, abandoning the current one if unfinished.
#[utoipa::path(
    post,
    path = "/sessions/{id}/next",
    responses(
        (status = 200, description = "Next checkpoint started", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "The learning path is already complete", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn next_checkpoint(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id(&headers)?;

    let session = state
        .sessions
        .get(id, user_id)
        .await
        .ok_or_else(|| not_found(id))?;
    let mut session = session.lock().await;

    if session.is_complete() {
        return Err(ApiError::Conflict(
            "The learning path is already complete".to_string(),
        ));
    }
    session.next_checkpoint();
    session.advance(&state.tutor).await;

    let view = session.view();
    info!(session_id = %id, completed = view.completed, total = view.total, "Advanced to next checkpoint");
    Ok((StatusCode::OK, Json(view)))
}
