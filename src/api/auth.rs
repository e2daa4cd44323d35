// Sign-in, sign-up, sign-out, and session inspection handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::forms::{self, CredentialsForm};
use super::{
    ActionError, AppError, AppState, ErrorBody, CODE_GENERIC, CODE_SECRET_HASH,
    CODE_USERNAME_EXISTS,
};
use crate::cognito::{claims, ProviderErrorKind, SignUpError};
use crate::session::Session;

#[derive(Serialize)]
struct SignupSuccessBody {
    success: SignupSuccess,
}

#[derive(Serialize)]
struct SignupSuccess {
    #[serde(rename = "UserConfirmed")]
    user_confirmed: bool,
    email: String,
}

#[derive(Serialize)]
struct SessionInfo {
    email: Option<String>,
}

/// POST /api/auth/signin
///
/// A completed attempt always answers 204. On success the session records
/// ride along as cookies; on a rejected credential pair no cookies are set
/// and the caller sees the same signed-out view as before.
pub async fn signin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<CredentialsForm>,
) -> Response {
    if let Err(e) = forms::validate_credentials(&form) {
        return AppError::Validation(e.to_string()).into_response();
    }

    match establish_session(&state, &form).await {
        Some(session) => {
            info!(email = %form.email, "signed in");
            let jar = state.sessions.save(jar, &session);
            (jar, StatusCode::NO_CONTENT).into_response()
        }
        None => {
            warn!(email = %form.email, "sign in failed");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// Credentials in, full session out: tokens first, then the token-for-keys
/// exchange. Any missing piece drops the whole attempt.
async fn establish_session(state: &AppState, form: &CredentialsForm) -> Option<Session> {
    let tokens = state
        .cognito
        .authenticate(&form.email, &form.password)
        .await?;
    let identity = state
        .cognito
        .exchange_for_credentials(&tokens.id_token, None)
        .await?;

    Some(Session {
        credentials: identity.credentials,
        tokens,
        identity_id: identity.identity_id,
    })
}

/// POST /api/auth/signup
///
/// Always answers 200 with an outcome envelope the frontend branches on:
/// `{"success": ..}` or `{"error": {"code": ..}}`.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CredentialsForm>,
) -> Response {
    if let Err(e) = forms::validate_credentials(&form) {
        return AppError::Validation(e.to_string()).into_response();
    }

    match state.cognito.sign_up(&form.email, &form.password).await {
        Ok(confirmation) => {
            info!(email = %form.email, "sign up accepted");
            Json(SignupSuccessBody {
                success: SignupSuccess {
                    user_confirmed: confirmation.user_confirmed,
                    email: form.email,
                },
            })
            .into_response()
        }
        Err(SignUpError::MissingSecretHash) => {
            signup_failure(CODE_SECRET_HASH, "Invalid secret hash".to_string(), None)
        }
        Err(SignUpError::Provider(e)) => match e.kind {
            ProviderErrorKind::UsernameExists => signup_failure(
                CODE_USERNAME_EXISTS,
                "Username already exists".to_string(),
                Some(form.email),
            ),
            ProviderErrorKind::InvalidPassword => {
                signup_failure(CODE_GENERIC, "Something went wrong.".to_string(), None)
            }
            _ => signup_failure(CODE_GENERIC, e.to_string(), None),
        },
    }
}

/// POST /api/auth/signout
pub async fn signout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let jar = state.sessions.clear(jar);
    (jar, StatusCode::NO_CONTENT).into_response()
}

/// GET /api/auth/session
///
/// Reports who is signed in, or 204 when nobody is.
pub async fn session(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    let email = claims::parse_unverified(&session.tokens.id_token).and_then(|c| c.email);
    Json(SessionInfo { email }).into_response()
}

fn signup_failure(code: u8, message: String, email: Option<String>) -> Response {
    Json(ErrorBody {
        error: ActionError {
            code,
            message,
            email,
        },
    })
    .into_response()
}
