use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when a stored or submitted value is not one of an enum's variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// -- Shipments --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    Delivered,
    Exception,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 5] = [
        Self::Pending,
        Self::PickedUp,
        Self::InTransit,
        Self::Delivered,
        Self::Exception,
    ];

    /// Statuses counted as "pending" on the admin dashboard.
    pub const ACTIVE: [ShipmentStatus; 3] = [Self::Pending, Self::PickedUp, Self::InTransit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Exception => "exception",
        }
    }

    /// Human-readable form used in tracking history, e.g. "Picked up".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::PickedUp => "Picked up",
            Self::InTransit => "In transit",
            Self::Delivered => "Delivered",
            Self::Exception => "Exception",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("shipment status", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Private,
    Business,
    Ecommerce,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Business => "business",
            Self::Ecommerce => "ecommerce",
        }
    }
}

impl FromStr for CustomerType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "business" => Ok(Self::Business),
            "ecommerce" => Ok(Self::Ecommerce),
            other => Err(UnknownVariant::new("customer type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverySpeed {
    Economy,
    Standard,
    Express,
}

impl DeliverySpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::Standard => "standard",
            Self::Express => "express",
        }
    }

    /// Business days between pickup and delivery.
    pub fn transit_days(&self) -> u32 {
        match self {
            Self::Express => 1,
            Self::Standard => 3,
            Self::Economy => 5,
        }
    }
}

impl FromStr for DeliverySpeed {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "economy" => Ok(Self::Economy),
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            other => Err(UnknownVariant::new("delivery speed", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: u32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{} cm", self.length, self.width, self.height)
    }
}

/// Sender or recipient contact block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl ContactDetails {
    /// Names the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("postal_code", &self.postal_code),
            ("city", &self.city),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// A carrier offer: who moves the parcel and the base price in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupSlot {
    pub id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub user_id: String,
    pub tracking_code: String,
    pub customer_type: CustomerType,
    pub business_name: Option<String>,
    pub vat_number: Option<String>,
    pub pickup: String,
    pub delivery: String,
    pub sender: ContactDetails,
    pub recipient: ContactDetails,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub carrier: Carrier,
    pub delivery_speed: DeliverySpeed,
    pub include_compliance: bool,
    pub label_url: String,
    pub pickup_time: DateTime<Utc>,
    pub total_price_cents: i64,
    pub status: ShipmentStatus,
    pub estimated_delivery: DateTime<Utc>,
    pub cancellation_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub date: DateTime<Utc>,
    pub location: String,
    pub status: String,
    pub description: String,
}

// -- Support --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownVariant::new("ticket status", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: String,
    pub message: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

// -- Demo and collaboration requests --

/// Lifecycle shared by demo requests and collaboration requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownVariant::new("request status", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub proposal: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_shipments: u64,
    pub pending_shipments: u64,
    pub completed_shipments: u64,
    pub total_demo_requests: u64,
    pub total_collaborations: u64,
    pub total_support_tickets: u64,
    pub open_support_tickets: u64,
}

// -- Identity --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_status_round_trips_through_str() {
        for status in ShipmentStatus::ALL {
            assert_eq!(status.as_str().parse::<ShipmentStatus>().unwrap(), status);
        }
        assert!("lost".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn shipment_status_serializes_snake_case() {
        let json = serde_json::to_string(&ShipmentStatus::PickedUp).unwrap();
        assert_eq!(json, "\"picked_up\"");
        assert_eq!(ShipmentStatus::InTransit.label(), "In transit");
    }

    #[test]
    fn missing_field_reports_first_blank() {
        let mut details = ContactDetails {
            name: "Anna".into(),
            address: "Mannerheimintie 1".into(),
            postal_code: "00100".into(),
            city: "Helsinki".into(),
            country: "FI".into(),
            ..Default::default()
        };
        assert_eq!(details.missing_field(), None);

        details.city = "  ".into();
        assert_eq!(details.missing_field(), Some("city"));
    }

    #[test]
    fn dimensions_display_in_centimetres() {
        let dims = Dimensions { length: 30, width: 20, height: 10 };
        assert_eq!(dims.to_string(), "30x20x10 cm");
    }
}
