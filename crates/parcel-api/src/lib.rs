//! REST routes for the shipping portal, plus the `/gateway` WebSocket.

pub mod admin;
pub mod bookings;
pub mod middleware;
pub mod public;
pub mod routes;
pub mod state;
pub mod support;

pub use routes::app;
pub use state::{AppState, AppStateInner};
