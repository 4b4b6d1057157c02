//! Booking workflow, customer operations and admin data access for the
//! shipping portal. Everything here sits between the HTTP handlers and the
//! SQLite store.

pub mod admin;
pub mod booking;
pub mod carrier;
pub mod convert;
pub mod error;
pub mod pricing;
pub mod store;
pub mod support;
pub mod sync;

use std::sync::Arc;

use parcel_db::Database;

/// Run a blocking database call off the async runtime.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
}
