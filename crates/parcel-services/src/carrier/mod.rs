//! Label and pickup providers.
//!
//! [`simulated::SimulatedCarrier`] answers locally and is the default;
//! [`http::HttpCarrier`] talks to a carrier API over HTTP.

pub mod http;
pub mod simulated;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parcel_types::models::PickupSlot;

use crate::error::CarrierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRequest {
    pub shipment_id: Uuid,
    pub carrier_name: String,
    pub tracking_code: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub weight_kg: f64,
    /// e.g. "30x20x10 cm"
    pub dimensions: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRequest {
    pub shipment_id: Uuid,
    pub carrier_name: String,
    pub pickup_address: String,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupConfirmation {
    pub confirmed: bool,
    pub pickup_time: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LabelService: Send + Sync {
    async fn generate_label(&self, request: &LabelRequest) -> Result<Label, CarrierError>;

    /// Withdraw the label issued for `shipment_id`.
    async fn void_label(&self, shipment_id: Uuid) -> Result<(), CarrierError>;
}

#[async_trait]
pub trait PickupService: Send + Sync {
    async fn available_slots(&self, date: NaiveDate) -> Result<Vec<PickupSlot>, CarrierError>;

    async fn schedule_pickup(&self, request: &PickupRequest) -> Result<PickupConfirmation, CarrierError>;

    /// Release the pickup reserved for `shipment_id`.
    async fn cancel_pickup(&self, shipment_id: Uuid) -> Result<(), CarrierError>;
}
