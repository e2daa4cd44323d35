// Court availability and reservation handlers
//
// Every route here needs signing credentials. With no session on the
// request, or with the backend unreachable, handlers answer 204 and the
// caller treats the absence of a body as "not authorized or not
// configured".

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::forms;
use super::{AppError, AppState};
use crate::courts::ReservationRequest;

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub reservation_id: String,
}

/// GET /api/availability?date=YYYY-MM-DD
pub async fn availability(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DateQuery>,
) -> Response {
    if let Err(e) = forms::validate_date(&query.date) {
        return AppError::Validation(e.to_string()).into_response();
    }
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    match state
        .courts
        .availability(&session.credentials, &query.date)
        .await
    {
        Some(availability) => Json(availability).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /api/reservations
pub async fn reserve(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(reservation): Json<ReservationRequest>,
) -> Response {
    if let Err(e) = forms::validate_date(&reservation.date) {
        return AppError::Validation(e.to_string()).into_response();
    }
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    match state
        .courts
        .reserve(&session.credentials, &reservation)
        .await
    {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /api/reservations
pub async fn list_reservations(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    match state.courts.reservations(&session.credentials).await {
        Some(records) => Json(records).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /api/reservations/delete
pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<DeleteRequest>,
) -> Response {
    let session = match state.sessions.load(&jar) {
        Some(session) => session,
        None => return StatusCode::NO_CONTENT.into_response(),
    };

    match state
        .courts
        .delete_reservation(&session.credentials, &request.reservation_id)
        .await
    {
        Some(text) => text.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
