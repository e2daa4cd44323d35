// HTTP API for the court reservation app

pub mod auth;
pub mod courts;
pub mod forms;
pub mod session_middleware;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::cognito::CognitoClient;
use crate::config::CourtsideConfig;
use crate::courts::CourtApiClient;
use crate::session::{RefreshGate, SessionStore};

/// Outcome codes the frontend branches on.
pub(crate) const CODE_GENERIC: u8 = 0;
pub(crate) const CODE_VALIDATION: u8 = 1;
pub(crate) const CODE_SECRET_HASH: u8 = 2;
pub(crate) const CODE_USERNAME_EXISTS: u8 = 5;

/// Structured failure payload: `{"error": {"code": .., "message": ..}}`.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub error: ActionError,
}

#[derive(Serialize)]
pub(crate) struct ActionError {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Application error types for the JSON API
pub enum AppError {
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => {
                let body = Json(ErrorBody {
                    error: ActionError {
                        code: CODE_VALIDATION,
                        message,
                        email: None,
                    },
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub cognito: CognitoClient,
    pub courts: CourtApiClient,
    pub refresh_gate: Arc<RefreshGate>,
}

impl AppState {
    pub fn from_config(config: &CourtsideConfig) -> Self {
        Self {
            sessions: SessionStore::new(config.server.is_prod()),
            cognito: CognitoClient::new(config.cognito.clone()),
            courts: CourtApiClient::new(config.backend.clone(), config.cognito.region.clone()),
            refresh_gate: Arc::new(RefreshGate::new()),
        }
    }
}

/// Create the application router with the refresh interceptor layered over
/// every route.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/auth/session", get(auth::session))
        .route("/api/availability", get(courts::availability))
        .route(
            "/api/reservations",
            get(courts::list_reservations).post(courts::reserve),
        )
        .route("/api/reservations/delete", post(courts::delete_reservation))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware::refresh_session,
        ))
        .with_state(state)
}
