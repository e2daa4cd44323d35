// Session refresh interceptor
//
// Runs ahead of every route. When the request carries a session whose
// signing credentials have expired, one refresh-plus-exchange round trip
// renews them and the renewed records ride out on the response. A gate
// keeps concurrent requests from stampeding the provider: losers of the
// race proceed with the session they arrived with.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppState;
use crate::session::store::session_record_names;
use crate::session::Session;


pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return next.run(request).await,
    };

    if !session.is_expired() {
        return next.run(request).await;
    }

    let permit = match state.refresh_gate.try_acquire() {
        Some(permit) => permit,
        None => {
            debug!("refresh already in flight, passing request through");
            return next.run(request).await;
        }
    };

    let refreshed = refresh_exchange(&state, &session).await;
    drop(permit);

    match refreshed {
        Some(renewed) => {
            let jar = state.sessions.save(jar, &renewed);
            let response = next.run(request).await;
            if response_rewrites_session(&response) {
                debug!("handler rewrote the session records, renewed set discarded");
                return response;
            }
            (jar, response).into_response()
        }
        None => {
            warn!("session refresh failed, continuing with expired records");
            next.run(request).await
        }
    }
}

/// Whether the downstream handler set any session record itself, as
/// sign-out removals and sign-in do. Browsers keep the last Set-Cookie per
/// name, so the renewed records may only be appended when the handler left
/// session state alone.
fn response_rewrites_session(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split('=').next())
        .any(|name| session_record_names().contains(&name))
}

/// One full renewal: trade the refresh token for new id and access tokens,
/// then trade the new id token for signing credentials. The provider does
/// not rotate the refresh token, so the original is carried over.
async fn refresh_exchange(state: &AppState, session: &Session) -> Option<Session> {
    let fragment = state
        .cognito
        .refresh(&session.tokens.id_token, &session.tokens.refresh_token)
        .await?;
    let identity = state
        .cognito
        .exchange_for_credentials(&fragment.id_token, Some(&session.identity_id))
        .await?;

    info!(identity_id = %identity.identity_id, "session refreshed");
    Some(Session {
        credentials: identity.credentials,
        tokens: fragment.with_refresh_token(session.tokens.refresh_token.clone()),
        identity_id: identity.identity_id,
    })
}
