use std::sync::Arc;

use parcel_gateway::dispatcher::Dispatcher;
use parcel_services::admin::AdminData;
use parcel_services::booking::BookingService;
use parcel_services::support::SupportService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub bookings: BookingService,
    pub admin: AdminData,
    pub support: SupportService,
    pub dispatcher: Dispatcher,
    /// Shared secret for verifying identity-provider tokens.
    pub jwt_secret: String,
    /// Origins the browser front-end may call from. Empty allows any.
    pub cors_origins: Vec<String>,
}
