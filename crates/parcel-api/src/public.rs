use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::error;

use parcel_types::api::{
    CollaborationSubmission, CreatedResponse, DemoRequestSubmission, QuoteQuery, SlotQuery,
};

use crate::state::AppState;
use crate::support::support_status;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn quote(State(state): State<AppState>, Query(query): Query<QuoteQuery>) -> impl IntoResponse {
    Json(state.bookings.quote(query.customer_type, query.delivery_speed))
}

pub async fn pickup_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let slots = state.bookings.pickup_slots(query.date).await.map_err(|e| {
        error!("Pickup slot lookup failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(slots))
}

/// Public tracking page data. Needs no sign-in and exposes no contact details.
pub async fn track(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let tracking = state
        .bookings
        .track(&tracking_code)
        .await
        .map_err(|e| {
            error!("Tracking lookup for {} failed: {:#}", tracking_code, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(tracking))
}

pub async fn submit_demo_request(
    State(state): State<AppState>,
    Json(req): Json<DemoRequestSubmission>,
) -> Result<impl IntoResponse, StatusCode> {
    let id = state.support.submit_demo_request(req).await.map_err(support_status)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn submit_collaboration(
    State(state): State<AppState>,
    Json(req): Json<CollaborationSubmission>,
) -> Result<impl IntoResponse, StatusCode> {
    let id = state.support.submit_collaboration(req).await.map_err(support_status)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
