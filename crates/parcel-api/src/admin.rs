//! Back-office handlers. Reads always answer `200` (possibly with an empty
//! list) and writes report `updated` / `sent`; failures reach admins as
//! gateway notices.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use parcel_types::api::{
    Claims, RequestStatusUpdate, SendMessageRequest, SendMessageResponse, ShipmentStatusUpdate,
    TicketStatusUpdate, UpdateResponse,
};

use crate::state::AppState;

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.load_stats().await)
}

pub async fn shipments(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.load_shipments().await)
}

pub async fn demo_requests(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.load_demo_requests().await)
}

pub async fn collaborations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.load_collaborations().await)
}

pub async fn tickets(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.admin.load_support_tickets().await)
}

pub async fn ticket_messages(State(state): State<AppState>, Path(ticket_id): Path<Uuid>) -> impl IntoResponse {
    Json(state.admin.load_ticket_messages(ticket_id).await)
}

pub async fn update_shipment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ShipmentStatusUpdate>,
) -> impl IntoResponse {
    let updated = state.admin.change_shipment_status(id, req.status).await;
    Json(UpdateResponse { updated })
}

pub async fn update_demo_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RequestStatusUpdate>,
) -> impl IntoResponse {
    let updated = state.admin.change_demo_status(id, req.status).await;
    Json(UpdateResponse { updated })
}

pub async fn update_collaboration_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RequestStatusUpdate>,
) -> impl IntoResponse {
    let updated = state.admin.change_collaboration_status(id, req.status).await;
    Json(UpdateResponse { updated })
}

pub async fn update_ticket_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TicketStatusUpdate>,
) -> impl IntoResponse {
    let updated = state.admin.change_ticket_status(id, req.status).await;
    Json(UpdateResponse { updated })
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    let sent = state.admin.send_message(ticket_id, &claims.sub, &req.message).await;
    Json(SendMessageResponse { sent })
}
