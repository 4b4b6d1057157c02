use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Carrier, ContactDetails, CustomerType, DeliverySpeed, Dimensions, RequestStatus, Role,
    ShipmentStatus, TicketStatus, TrackingEvent,
};

// -- JWT Claims --

/// Claims carried by tokens from the identity provider. Shared by the REST
/// middleware and the notification gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// -- Booking --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingRequest {
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub pickup: String,
    pub delivery: String,
    pub carrier: Carrier,
    pub delivery_speed: DeliverySpeed,
    #[serde(default)]
    pub include_compliance: bool,
    pub customer_type: CustomerType,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
    pub sender: ContactDetails,
    pub recipient: ContactDetails,
    #[serde(default)]
    pub pickup_slot_id: Option<String>,
    #[serde(default = "default_label_language")]
    pub label_language: String,
}

fn default_label_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub shipment_id: Uuid,
    pub tracking_code: String,
    pub label_url: String,
    pub pickup_time: DateTime<Utc>,
    pub total_price_cents: i64,
    pub estimated_delivery: DateTime<Utc>,
    pub cancellation_deadline: DateTime<Utc>,
}

/// Either a confirmed booking or a failure message, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    #[serde(flatten)]
    pub booking: Option<BookingConfirmation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BookingResponse {
    pub fn confirmed(booking: BookingConfirmation) -> Self {
        Self {
            success: true,
            booking: Some(booking),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            booking: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub customer_type: CustomerType,
    #[serde(default = "default_speed")]
    pub delivery_speed: DeliverySpeed,
}

fn default_speed() -> DeliverySpeed {
    DeliverySpeed::Standard
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub carrier: Carrier,
    pub eta_days: u32,
    pub compliance_surcharge_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

// -- Tracking --

/// Public view of a shipment: no addresses or contact details.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackingResponse {
    pub tracking_code: String,
    pub status: ShipmentStatus,
    pub carrier_name: String,
    pub estimated_delivery: DateTime<Utc>,
    pub events: Vec<TrackingEvent>,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipmentStatusUpdate {
    pub status: ShipmentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestStatusUpdate {
    pub status: RequestStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub updated: bool,
}

// -- Support --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenTicketRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub sent: bool,
}

// -- Public submissions --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoRequestSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaborationSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    pub proposal: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}
