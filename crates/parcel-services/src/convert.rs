//! Conversions between SQLite rows and API models.

use anyhow::{Context, Result};
use tracing::warn;

use parcel_db::models::{
    BookingRow, CollaborationRow, DemoRequestRow, SupportMessageRow, TicketRow, TrackingEventRow,
};
use parcel_db::{parse_timestamp, timestamp};
use parcel_types::models::{
    Carrier, Collaboration, DemoRequest, Dimensions, Shipment, SupportMessage, SupportTicket,
    TrackingEvent,
};

pub fn shipment_to_row(shipment: &Shipment) -> Result<BookingRow> {
    Ok(BookingRow {
        id: shipment.id.to_string(),
        user_id: shipment.user_id.clone(),
        tracking_code: shipment.tracking_code.clone(),
        customer_type: shipment.customer_type.as_str().to_string(),
        business_name: shipment.business_name.clone(),
        vat_number: shipment.vat_number.clone(),
        pickup: shipment.pickup.clone(),
        delivery: shipment.delivery.clone(),
        sender_details: serde_json::to_string(&shipment.sender)?,
        recipient_details: serde_json::to_string(&shipment.recipient)?,
        weight_kg: shipment.weight_kg,
        length_cm: shipment.dimensions.length,
        width_cm: shipment.dimensions.width,
        height_cm: shipment.dimensions.height,
        carrier_name: shipment.carrier.name.clone(),
        carrier_price_cents: shipment.carrier.price_cents,
        delivery_speed: shipment.delivery_speed.as_str().to_string(),
        include_compliance: shipment.include_compliance,
        label_url: shipment.label_url.clone(),
        pickup_time: timestamp(shipment.pickup_time),
        total_price_cents: shipment.total_price_cents,
        status: shipment.status.as_str().to_string(),
        estimated_delivery: timestamp(shipment.estimated_delivery),
        cancellation_deadline: timestamp(shipment.cancellation_deadline),
        created_at: timestamp(shipment.created_at),
        updated_at: timestamp(shipment.updated_at),
    })
}

pub fn shipment_from_row(row: BookingRow) -> Result<Shipment> {
    Ok(Shipment {
        id: row.id.parse().with_context(|| format!("booking id '{}'", row.id))?,
        customer_type: row.customer_type.parse()?,
        sender: serde_json::from_str(&row.sender_details).context("sender_details")?,
        recipient: serde_json::from_str(&row.recipient_details).context("recipient_details")?,
        dimensions: Dimensions {
            length: row.length_cm,
            width: row.width_cm,
            height: row.height_cm,
        },
        carrier: Carrier {
            name: row.carrier_name,
            price_cents: row.carrier_price_cents,
        },
        delivery_speed: row.delivery_speed.parse()?,
        pickup_time: parse_timestamp(&row.pickup_time)?,
        status: row.status.parse()?,
        estimated_delivery: parse_timestamp(&row.estimated_delivery)?,
        cancellation_deadline: parse_timestamp(&row.cancellation_deadline)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        user_id: row.user_id,
        tracking_code: row.tracking_code,
        business_name: row.business_name,
        vat_number: row.vat_number,
        pickup: row.pickup,
        delivery: row.delivery,
        weight_kg: row.weight_kg,
        include_compliance: row.include_compliance,
        label_url: row.label_url,
        total_price_cents: row.total_price_cents,
    })
}

/// Convert a list of rows, dropping (and logging) any that no longer parse.
pub fn collect_valid<R, T>(rows: Vec<R>, what: &str, convert: impl Fn(R) -> Result<T>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match convert(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping corrupt {} row: {:#}", what, e);
                None
            }
        })
        .collect()
}

pub fn tracking_event_from_row(row: TrackingEventRow) -> Result<TrackingEvent> {
    Ok(TrackingEvent {
        date: parse_timestamp(&row.occurred_at)?,
        location: row.location,
        status: row.status,
        description: row.description,
    })
}

pub fn tracking_event_to_row(booking_id: &str, event: &TrackingEvent) -> TrackingEventRow {
    TrackingEventRow {
        booking_id: booking_id.to_string(),
        occurred_at: timestamp(event.date),
        location: event.location.clone(),
        status: event.status.clone(),
        description: event.description.clone(),
    }
}

pub fn ticket_from_row(row: TicketRow) -> Result<SupportTicket> {
    Ok(SupportTicket {
        id: row.id.parse().with_context(|| format!("ticket id '{}'", row.id))?,
        status: row.status.parse()?,
        created_at: parse_timestamp(&row.created_at)?,
        user_id: row.user_id,
        subject: row.subject,
        message: row.message,
    })
}

pub fn message_from_row(row: SupportMessageRow) -> Result<SupportMessage> {
    Ok(SupportMessage {
        id: row.id.parse().with_context(|| format!("message id '{}'", row.id))?,
        ticket_id: row.ticket_id.parse().context("ticket_id")?,
        created_at: parse_timestamp(&row.created_at)?,
        user_id: row.user_id,
        message: row.message,
        is_admin: row.is_admin,
    })
}

pub fn demo_request_from_row(row: DemoRequestRow) -> Result<DemoRequest> {
    Ok(DemoRequest {
        id: row.id.parse().with_context(|| format!("demo request id '{}'", row.id))?,
        status: row.status.parse()?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        email: row.email,
        company: row.company,
        message: row.message,
    })
}

pub fn collaboration_from_row(row: CollaborationRow) -> Result<Collaboration> {
    Ok(Collaboration {
        id: row.id.parse().with_context(|| format!("collaboration id '{}'", row.id))?,
        status: row.status.parse()?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        email: row.email,
        company: row.company,
        proposal: row.proposal,
    })
}
