use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use parcel_db::Database;

use crate::blocking;
use crate::store::{LocalStore, ShipmentStore};

/// Background task that moves fallback bookings into the database.
///
/// Runs on an interval; each record is inserted into the primary store and
/// its file removed. Records already in the database under the same id are
/// just removed. A record whose tracking code belongs to another booking is
/// left on disk for an operator.
pub async fn run_fallback_sync_loop(
    local: Arc<LocalStore>,
    db: Arc<Database>,
    primary: Arc<dyn ShipmentStore>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match replay_fallback(&local, &db, primary.as_ref()).await {
            Ok(count) => {
                if count > 0 {
                    info!("Fallback sync: moved {} bookings into the database", count);
                }
            }
            Err(e) => {
                warn!("Fallback sync error: {}", e);
            }
        }
    }
}

/// One replay pass. Returns how many records were moved.
pub async fn replay_fallback(
    local: &LocalStore,
    db: &Arc<Database>,
    primary: &dyn ShipmentStore,
) -> anyhow::Result<usize> {
    let pending = local.list().await?;
    let mut moved = 0;

    for shipment in pending {
        let id = shipment.id.to_string();
        let code = shipment.tracking_code.clone();
        let (same_id, code_taken) = blocking(db, move |db| {
            Ok((db.get_booking(&id)?.is_some(), db.booking_exists(&code)?))
        })
        .await?;

        if same_id {
            local.remove(&shipment.tracking_code).await?;
            continue;
        }
        if code_taken {
            error!(
                "Fallback sync: tracking code {} of shipment {} belongs to another booking; keeping the file",
                shipment.tracking_code, shipment.id
            );
            continue;
        }

        if let Err(e) = primary.save(&shipment).await {
            // Database still unhealthy; try again next tick.
            warn!("Fallback sync: {} not replayed: {}", shipment.tracking_code, e);
            break;
        }
        moved += 1;
        local.remove(&shipment.tracking_code).await?;
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use parcel_gateway::dispatcher::Dispatcher;
    use parcel_types::models::Shipment;

    use super::*;
    use crate::booking::BookingService;
    use crate::booking::tests::{FakeCarrier, RecordingStore, request};
    use crate::pricing::BookingConfig;
    use crate::store::DatabaseStore;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("parcel-fallback-{}", Uuid::new_v4()))
    }

    /// Book `count` shipments and return the records the primary store saw.
    async fn shipments(count: usize) -> Vec<Shipment> {
        let recorder = Arc::new(RecordingStore::default());
        let carrier = Arc::new(FakeCarrier::default());
        let service = BookingService::new(
            Arc::new(Database::open_in_memory().unwrap()),
            carrier.clone(),
            carrier,
            recorder.clone(),
            Arc::new(RecordingStore::default()),
            Dispatcher::new(),
            BookingConfig::default(),
        );
        for _ in 0..count {
            service.book_shipment("u1", request()).await.unwrap();
        }
        recorder.saved.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = temp_dir();
        let local = LocalStore::new(dir.clone()).await.unwrap();
        let booked = shipments(2).await;
        for shipment in &booked {
            local.save(shipment).await.unwrap();
        }

        let listed = local.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|s| s.tracking_code == booked[0].tracking_code));

        local.remove(&booked[0].tracking_code).await.unwrap();
        // already gone is not an error
        local.remove(&booked[0].tracking_code).await.unwrap();
        assert_eq!(local.list().await.unwrap().len(), 1);

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_files_are_skipped() {
        let dir = temp_dir();
        let local = LocalStore::new(dir.clone()).await.unwrap();
        tokio::fs::write(dir.join("EPNBROKEN.json"), b"{ not json").await.unwrap();
        tokio::fs::write(dir.join("notes.txt"), b"ignored").await.unwrap();

        assert!(local.list().await.unwrap().is_empty());

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn replay_moves_records_into_database() {
        let dir = temp_dir();
        let local = LocalStore::new(dir.clone()).await.unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let primary = DatabaseStore::new(db.clone());

        let booked = shipments(2).await;
        for shipment in &booked {
            local.save(shipment).await.unwrap();
        }
        // one of them already made it into the database
        primary.save(&booked[1]).await.unwrap();

        let moved = replay_fallback(&local, &db, &primary).await.unwrap();
        assert_eq!(moved, 1);
        assert!(local.list().await.unwrap().is_empty());
        assert_eq!(db.count_bookings(&[]).unwrap(), 2);

        let events = db.list_tracking_events(&booked[0].id.to_string()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, "Shipment booked");

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn replay_stops_when_database_still_failing() {
        let dir = temp_dir();
        let local = LocalStore::new(dir.clone()).await.unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let failing = RecordingStore { fails: true, ..Default::default() };

        for shipment in &shipments(2).await {
            local.save(shipment).await.unwrap();
        }

        let moved = replay_fallback(&local, &db, &failing).await.unwrap();
        assert_eq!(moved, 0);
        assert_eq!(local.list().await.unwrap().len(), 2);
        assert_eq!(failing.attempts.load(std::sync::atomic::Ordering::SeqCst), 1);

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn replay_keeps_record_whose_code_belongs_to_another_booking() {
        let dir = temp_dir();
        let local = LocalStore::new(dir.clone()).await.unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let primary = DatabaseStore::new(db.clone());

        let booked = shipments(1).await;
        local.save(&booked[0]).await.unwrap();

        let mut other = booked[0].clone();
        other.id = Uuid::new_v4();
        primary.save(&other).await.unwrap();

        let moved = replay_fallback(&local, &db, &primary).await.unwrap();
        assert_eq!(moved, 0);
        assert_eq!(local.list().await.unwrap().len(), 1);
        assert!(db.get_booking(&booked[0].id.to_string()).unwrap().is_none());
        assert_eq!(db.count_bookings(&[]).unwrap(), 1);

        // a second pass still leaves it alone
        assert_eq!(replay_fallback(&local, &db, &primary).await.unwrap(), 0);
        assert_eq!(local.list().await.unwrap().len(), 1);

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }
}
