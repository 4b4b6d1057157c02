use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use parcel_services::error::SupportError;
use parcel_types::api::{Claims, OpenTicketRequest, SendMessageRequest};

use crate::state::AppState;

pub(crate) fn support_status(e: SupportError) -> StatusCode {
    match e {
        SupportError::Invalid(_) => StatusCode::BAD_REQUEST,
        SupportError::NotFound => StatusCode::NOT_FOUND,
        SupportError::Database(e) => {
            error!("Support request failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn open_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenTicketRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let ticket = state.support.open_ticket(&claims.sub, req).await.map_err(support_status)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let tickets = state.support.list_own_tickets(&claims.sub).await.map_err(support_status)?;
    Ok(Json(tickets))
}

pub async fn ticket_messages(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = state
        .support
        .ticket_messages(ticket_id, &claims.sub)
        .await
        .map_err(support_status)?;
    Ok(Json(messages))
}

pub async fn reply(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = state
        .support
        .reply(ticket_id, &claims.sub, &req.message)
        .await
        .map_err(support_status)?;
    Ok((StatusCode::CREATED, Json(message)))
}
