//! Database row types. These map directly to SQLite rows.
//! Distinct from parcel-types API models to keep the DB layer independent.
//! Timestamps are RFC 3339 strings (see [`crate::timestamp`]).

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRow {
    pub id: String,
    pub user_id: String,
    pub tracking_code: String,
    pub customer_type: String,
    pub business_name: Option<String>,
    pub vat_number: Option<String>,
    pub pickup: String,
    pub delivery: String,
    /// JSON-encoded contact block
    pub sender_details: String,
    /// JSON-encoded contact block
    pub recipient_details: String,
    pub weight_kg: f64,
    pub length_cm: u32,
    pub width_cm: u32,
    pub height_cm: u32,
    pub carrier_name: String,
    pub carrier_price_cents: i64,
    pub delivery_speed: String,
    pub include_compliance: bool,
    pub label_url: String,
    pub pickup_time: String,
    pub total_price_cents: i64,
    pub status: String,
    pub estimated_delivery: String,
    pub cancellation_deadline: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEventRow {
    pub booking_id: String,
    pub occurred_at: String,
    pub location: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupportMessageRow {
    pub id: String,
    pub ticket_id: String,
    pub user_id: String,
    pub message: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoRequestRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub proposal: String,
    pub status: String,
    pub created_at: String,
}
