use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use parcel_gateway::connection;

use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;
use crate::{admin, bookings, public, support};

/// The full HTTP surface.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(public::health))
        .route("/carrier/quote", get(public::quote))
        .route("/pickup-slots", get(public::pickup_slots))
        .route("/track/{tracking_code}", get(public::track))
        .route("/demo-requests", post(public::submit_demo_request))
        .route("/collaborations", post(public::submit_collaboration))
        .route("/gateway", get(ws_upgrade));

    let customer_routes = Router::new()
        .route("/bookings", post(bookings::create_booking).get(bookings::list_bookings))
        .route(
            "/bookings/{tracking_code}",
            get(bookings::get_booking).delete(bookings::cancel_booking),
        )
        .route("/support/tickets", post(support::open_ticket).get(support::list_tickets))
        .route(
            "/support/tickets/{ticket_id}/messages",
            get(support::ticket_messages).post(support::reply),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // route_layer: last added runs first, so auth precedes the role check
    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::stats))
        .route("/admin/shipments", get(admin::shipments))
        .route("/admin/shipments/{id}/status", put(admin::update_shipment_status))
        .route("/admin/demo-requests", get(admin::demo_requests))
        .route("/admin/demo-requests/{id}/status", put(admin::update_demo_status))
        .route("/admin/collaborations", get(admin::collaborations))
        .route("/admin/collaborations/{id}/status", put(admin::update_collaboration_status))
        .route("/admin/tickets", get(admin::tickets))
        .route("/admin/tickets/{id}/status", put(admin::update_ticket_status))
        .route(
            "/admin/tickets/{id}/messages",
            get(admin::ticket_messages).post(admin::send_message),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(customer_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser front-end, which is served from its own origin.
/// An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false)
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
