//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CheckpointResult, CheckpointStatus, CheckpointView, CreateSessionPayload, ErrorResponse,
        SessionSummary, SessionView, SubmitAnswersPayload,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
        handlers::delete_session,
        handlers::submit_answers,
        handlers::next_checkpoint,
    ),
    components(
        schemas(SessionView, SessionSummary, CheckpointView, CheckpointResult, CheckpointStatus, CreateSessionPayload, SubmitAnswersPayload, ErrorResponse)
    ),
    tags(
        (name = "Mastery API", description = "Learning path sessions for the mastery tutor")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/answers", post(handlers::submit_answers))
        .route("/sessions/{id}/next", post(handlers::next_checkpoint))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
