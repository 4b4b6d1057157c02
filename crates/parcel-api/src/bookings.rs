use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};

use parcel_types::api::{BookingRequest, BookingResponse, CancelResponse, Claims};

use crate::state::AppState;

/// Run the booking workflow. Failures come back as `422` with
/// `{ "success": false, "message": ... }`.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BookingRequest>,
) -> impl IntoResponse {
    match state.bookings.book_shipment(&claims.sub, req).await {
        Ok(booking) => (StatusCode::CREATED, Json(BookingResponse::confirmed(booking))),
        Err(e) => {
            warn!("Booking for {} failed: {}", claims.sub, e);
            (StatusCode::UNPROCESSABLE_ENTITY, Json(BookingResponse::failed(e.to_string())))
        }
    }
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let shipments = state.bookings.list_shipments(&claims.sub).await.map_err(|e| {
        error!("Listing bookings for {} failed: {:#}", claims.sub, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(shipments))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let shipment = state
        .bookings
        .get_booking(&tracking_code, &claims.sub)
        .await
        .map_err(|e| {
            error!("Loading booking {} failed: {:#}", tracking_code, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(shipment))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let cancelled = state.bookings.cancel_booking(&tracking_code, &claims.sub).await;
    Json(CancelResponse { cancelled })
}
