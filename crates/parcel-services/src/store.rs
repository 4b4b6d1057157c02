use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use parcel_db::Database;
use parcel_types::models::{Shipment, TrackingEvent};

use crate::blocking;
use crate::convert::{shipment_to_row, tracking_event_to_row};
use crate::error::StoreError;

/// Somewhere a confirmed booking can be written.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn save(&self, shipment: &Shipment) -> Result<(), StoreError>;
}

/// First history entry recorded with every booking.
pub fn booked_event(shipment: &Shipment) -> TrackingEvent {
    TrackingEvent {
        date: shipment.created_at,
        location: shipment.pickup.clone(),
        status: shipment.status.label().to_string(),
        description: "Shipment booked".to_string(),
    }
}

/// The primary store: the `booking` table.
pub struct DatabaseStore {
    db: Arc<Database>,
}

impl DatabaseStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShipmentStore for DatabaseStore {
    async fn save(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let row = shipment_to_row(shipment)?;
        let event = tracking_event_to_row(&row.id, &booked_event(shipment));
        blocking(&self.db, move |db| db.insert_booking(&row, &event)).await?;
        Ok(())
    }
}

/// Fallback store: one JSON file per booking at `{dir}/{tracking_code}.json`.
///
/// Records written here are replayed into the database by
/// [`crate::sync::run_fallback_sync_loop`].
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub async fn new(dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir).await?;
        info!("Fallback booking directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn file_path(&self, tracking_code: &str) -> PathBuf {
        self.dir.join(format!("{}.json", tracking_code))
    }

    /// Every pending record, oldest file name first. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<Shipment>, StoreError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut shipments = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Shipment>(&bytes) {
                Ok(shipment) => shipments.push(shipment),
                Err(e) => warn!("Unreadable fallback record {}: {}", path.display(), e),
            }
        }
        Ok(shipments)
    }

    pub async fn remove(&self, tracking_code: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.file_path(tracking_code)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Fallback record {} already gone", tracking_code);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ShipmentStore for LocalStore {
    async fn save(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(shipment)?;
        // Write then rename so a crash never leaves a half-written record.
        let tmp = self.dir.join(format!(".{}.tmp", shipment.tracking_code));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, self.file_path(&shipment.tracking_code)).await?;
        info!("Booking {} written to fallback store", shipment.tracking_code);
        Ok(())
    }
}
