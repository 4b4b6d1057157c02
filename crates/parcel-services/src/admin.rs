use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use parcel_db::models::SupportMessageRow;
use parcel_db::{Database, timestamp};
use parcel_gateway::dispatcher::Dispatcher;
use parcel_types::events::GatewayEvent;
use parcel_types::models::{
    AdminStats, Collaboration, DemoRequest, RequestStatus, Shipment, ShipmentStatus, SupportMessage,
    SupportTicket, TicketStatus, TrackingEvent,
};

use crate::blocking;
use crate::convert::{
    collaboration_from_row, collect_valid, demo_request_from_row, message_from_row, shipment_from_row,
    ticket_from_row, tracking_event_to_row,
};

/// Back-office reads and writes.
///
/// Reads never fail: errors are logged and an empty (or zeroed) result is
/// returned. Writes return whether they took effect and report the outcome
/// to connected admins as a notice.
#[derive(Clone)]
pub struct AdminData {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl AdminData {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    fn notify(&self, event: GatewayEvent) {
        self.dispatcher.notify_admins(event);
    }

    pub async fn load_stats(&self) -> AdminStats {
        let active: Vec<&'static str> = ShipmentStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
        let result = blocking(&self.db, move |db| {
            Ok(AdminStats {
                total_shipments: db.count_bookings(&[])?,
                pending_shipments: db.count_bookings(&active)?,
                completed_shipments: db.count_bookings(&[ShipmentStatus::Delivered.as_str()])?,
                total_demo_requests: db.count_demo_requests()?,
                total_collaborations: db.count_collaborations()?,
                total_support_tickets: db.count_tickets(None)?,
                open_support_tickets: db.count_tickets(Some(TicketStatus::Open.as_str()))?,
            })
        })
        .await;

        result.unwrap_or_else(|e| {
            error!("Error fetching stats: {:#}", e);
            AdminStats::default()
        })
    }

    pub async fn load_shipments(&self) -> Vec<Shipment> {
        match blocking(&self.db, |db| db.list_bookings()).await {
            Ok(rows) => {
                info!("Shipments loaded: {}", rows.len());
                collect_valid(rows, "booking", shipment_from_row)
            }
            Err(e) => {
                error!("Error loading shipments: {:#}", e);
                self.notify(GatewayEvent::failure("Error Loading Shipments", e.to_string()));
                Vec::new()
            }
        }
    }

    pub async fn load_demo_requests(&self) -> Vec<DemoRequest> {
        match blocking(&self.db, |db| db.list_demo_requests()).await {
            Ok(rows) => collect_valid(rows, "demo request", demo_request_from_row),
            Err(e) => {
                error!("Error loading demo requests: {:#}", e);
                Vec::new()
            }
        }
    }

    pub async fn load_collaborations(&self) -> Vec<Collaboration> {
        match blocking(&self.db, |db| db.list_collaborations()).await {
            Ok(rows) => collect_valid(rows, "collaboration", collaboration_from_row),
            Err(e) => {
                error!("Error loading collaborations: {:#}", e);
                Vec::new()
            }
        }
    }

    pub async fn load_support_tickets(&self) -> Vec<SupportTicket> {
        match blocking(&self.db, |db| db.list_tickets()).await {
            Ok(rows) => collect_valid(rows, "support ticket", ticket_from_row),
            Err(e) => {
                error!("Error loading support tickets: {:#}", e);
                self.notify(GatewayEvent::failure("Error Loading Support Tickets", e.to_string()));
                Vec::new()
            }
        }
    }

    /// Messages on a ticket, oldest first.
    pub async fn load_ticket_messages(&self, ticket_id: Uuid) -> Vec<SupportMessage> {
        let tid = ticket_id.to_string();
        match blocking(&self.db, move |db| db.list_ticket_messages(&tid)).await {
            Ok(rows) => collect_valid(rows, "support message", message_from_row),
            Err(e) => {
                error!("Error loading ticket messages: {:#}", e);
                self.notify(GatewayEvent::failure("Error", "Failed to load message history"));
                Vec::new()
            }
        }
    }

    /// Set a shipment's status and append a tracking event for it. The
    /// owner is told about the change over the gateway.
    pub async fn change_shipment_status(&self, shipment_id: Uuid, status: ShipmentStatus) -> bool {
        let id = shipment_id.to_string();
        let now = Utc::now();
        let event = TrackingEvent {
            date: now,
            location: "Admin Dashboard".to_string(),
            status: status.label().to_string(),
            description: "Status updated by admin".to_string(),
        };

        let result = blocking(&self.db, move |db| {
            let row = tracking_event_to_row(&id, &event);
            if !db.update_booking_status(&id, status.as_str(), &timestamp(now), &row)? {
                return Ok(None);
            }
            db.get_booking(&id)
        })
        .await;

        match result {
            Ok(Some(row)) => {
                info!("Shipment {} set to {}", shipment_id, status);
                self.dispatcher.notify_user(
                    &row.user_id,
                    GatewayEvent::ShipmentStatusChanged {
                        tracking_code: row.tracking_code,
                        status,
                    },
                );
                self.notify(GatewayEvent::notice(
                    "Status Updated",
                    format!("Shipment status changed to {}.", status.as_str().replace('_', " ")),
                ));
                true
            }
            Ok(None) => {
                self.notify(GatewayEvent::failure(
                    "Status Update Failed",
                    "Could not update the shipment status in the database.",
                ));
                false
            }
            Err(e) => {
                error!("Error updating shipment {} status: {:#}", shipment_id, e);
                self.notify(GatewayEvent::failure(
                    "Status Update Failed",
                    "Could not update the shipment status in the database.",
                ));
                false
            }
        }
    }

    pub async fn change_demo_status(&self, demo_id: Uuid, status: RequestStatus) -> bool {
        let id = demo_id.to_string();
        let result = blocking(&self.db, move |db| db.update_demo_request_status(&id, status.as_str())).await;
        self.report_status_change("demo request", result, status.as_str())
    }

    pub async fn change_collaboration_status(&self, collaboration_id: Uuid, status: RequestStatus) -> bool {
        let id = collaboration_id.to_string();
        let result =
            blocking(&self.db, move |db| db.update_collaboration_status(&id, status.as_str())).await;
        self.report_status_change("collaboration", result, status.as_str())
    }

    pub async fn change_ticket_status(&self, ticket_id: Uuid, status: TicketStatus) -> bool {
        let id = ticket_id.to_string();
        let result = blocking(&self.db, move |db| db.update_ticket_status(&id, status.as_str())).await;
        self.report_status_change("support ticket", result, status.as_str())
    }

    fn report_status_change(&self, what: &str, result: anyhow::Result<bool>, status: &str) -> bool {
        match result {
            Ok(true) => {
                self.notify(GatewayEvent::notice(
                    "Status Updated",
                    format!("{} status changed to {}.", capitalize(what), status.replace('_', " ")),
                ));
                true
            }
            Ok(false) => {
                self.notify(GatewayEvent::failure(
                    "Status Update Failed",
                    format!("Could not update the {} status.", what),
                ));
                false
            }
            Err(e) => {
                error!("Error updating {} status: {:#}", what, e);
                self.notify(GatewayEvent::failure(
                    "Status Update Failed",
                    format!("Could not update the {} status.", what),
                ));
                false
            }
        }
    }

    /// Post an admin reply on a ticket. Blank messages are rejected.
    pub async fn send_message(&self, ticket_id: Uuid, admin_id: &str, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            self.notify(GatewayEvent::failure("Error", "Failed to send your response"));
            return false;
        }

        let row = SupportMessageRow {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            user_id: admin_id.to_string(),
            message: message.to_string(),
            is_admin: true,
            created_at: timestamp(Utc::now()),
        };

        let result = blocking(&self.db, move |db| {
            let ticket = db.get_ticket(&row.ticket_id)?;
            db.insert_support_message(&row)?;
            Ok(ticket)
        })
        .await;

        match result {
            Ok(ticket) => {
                if let Some(ticket) = ticket {
                    self.dispatcher.notify_user(
                        &ticket.user_id,
                        GatewayEvent::notice("New Support Reply", format!("Re: {}", ticket.subject)),
                    );
                }
                self.notify(GatewayEvent::notice("Message Sent", "Your response has been sent to the user."));
                true
            }
            Err(e) => {
                error!("Error sending message on ticket {}: {:#}", ticket_id, e);
                self.notify(GatewayEvent::failure("Error", "Failed to send your response"));
                false
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use parcel_db::models::{DemoRequestRow, TicketRow};
    use parcel_gateway::dispatcher::Envelope;
    use tokio::sync::broadcast;

    use super::*;
    use crate::booking::tests::{FakeCarrier, RecordingStore, request};
    use crate::booking::BookingService;
    use crate::pricing::BookingConfig;
    use crate::store::DatabaseStore;

    fn admin() -> (AdminData, Arc<Database>, broadcast::Receiver<Envelope>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let dispatcher = Dispatcher::new();
        let rx = dispatcher.subscribe();
        (AdminData::new(db.clone(), dispatcher), db, rx)
    }

    fn last_notice(rx: &mut broadcast::Receiver<Envelope>) -> Option<(String, Envelope)> {
        let mut last = None;
        while let Ok(envelope) = rx.try_recv() {
            if let GatewayEvent::Notice { title, .. } = &envelope.event {
                last = Some((title.clone(), envelope.clone()));
            }
        }
        last
    }

    async fn book(db: &Arc<Database>, user_id: &str) -> Uuid {
        let carrier = Arc::new(FakeCarrier::default());
        let service = BookingService::new(
            db.clone(),
            carrier.clone(),
            carrier,
            Arc::new(DatabaseStore::new(db.clone())),
            Arc::new(RecordingStore::default()),
            Dispatcher::new(),
            BookingConfig::default(),
        );
        service.book_shipment(user_id, request()).await.unwrap().shipment_id
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let (admin, db, _rx) = admin();
        let delivered = book(&db, "u1").await;
        book(&db, "u1").await;
        book(&db, "u2").await;
        assert!(admin.change_shipment_status(delivered, ShipmentStatus::Delivered).await);

        db.insert_ticket(&TicketRow {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".into(),
            subject: "Help".into(),
            message: "Where?".into(),
            status: "open".into(),
            created_at: timestamp(Utc::now()),
        })
        .unwrap();

        let stats = admin.load_stats().await;
        assert_eq!(stats.total_shipments, 3);
        assert_eq!(stats.pending_shipments, 2);
        assert_eq!(stats.completed_shipments, 1);
        assert_eq!(stats.total_support_tickets, 1);
        assert_eq!(stats.open_support_tickets, 1);
        assert_eq!(stats.total_demo_requests, 0);
    }

    #[tokio::test]
    async fn shipment_status_change_appends_tracking_event() {
        let (admin, db, mut rx) = admin();
        let id = book(&db, "owner").await;

        assert!(admin.change_shipment_status(id, ShipmentStatus::PickedUp).await);

        let events = db.list_tracking_events(&id.to_string()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].location, "Admin Dashboard");
        assert_eq!(events[1].status, "Picked up");

        let shipments = admin.load_shipments().await;
        assert_eq!(shipments[0].status, ShipmentStatus::PickedUp);

        let mut owner_told = false;
        let mut saw_updated = false;
        while let Ok(envelope) = rx.try_recv() {
            match &envelope.event {
                GatewayEvent::ShipmentStatusChanged { status, .. } => {
                    assert!(envelope.is_for("owner", false));
                    assert_eq!(*status, ShipmentStatus::PickedUp);
                    owner_told = true;
                }
                GatewayEvent::Notice { title, .. } if title == "Status Updated" => saw_updated = true,
                _ => {}
            }
        }
        assert!(owner_told && saw_updated);
    }

    #[tokio::test]
    async fn status_change_on_missing_row_returns_false_with_notice() {
        let (admin, _db, mut rx) = admin();

        assert!(!admin.change_shipment_status(Uuid::new_v4(), ShipmentStatus::Delivered).await);
        let (title, envelope) = last_notice(&mut rx).unwrap();
        assert_eq!(title, "Status Update Failed");
        assert!(envelope.is_for("any-admin", true));

        assert!(!admin.change_demo_status(Uuid::new_v4(), RequestStatus::Scheduled).await);
        assert_eq!(last_notice(&mut rx).unwrap().0, "Status Update Failed");
    }

    #[tokio::test]
    async fn demo_status_update_is_last_writer_wins() {
        let (admin, db, _rx) = admin();
        let id = Uuid::new_v4();
        db.insert_demo_request(&DemoRequestRow {
            id: id.to_string(),
            name: "Lena".into(),
            email: "lena@example.com".into(),
            company: None,
            message: None,
            status: "pending".into(),
            created_at: timestamp(Utc::now()),
        })
        .unwrap();

        assert!(admin.change_demo_status(id, RequestStatus::Scheduled).await);
        assert!(admin.change_demo_status(id, RequestStatus::Cancelled).await);
        assert_eq!(admin.load_demo_requests().await[0].status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn admin_reply_is_trimmed_and_flagged() {
        let (admin, db, _rx) = admin();
        let ticket_id = Uuid::new_v4();
        db.insert_ticket(&TicketRow {
            id: ticket_id.to_string(),
            user_id: "u1".into(),
            subject: "Damaged box".into(),
            message: "It arrived wet".into(),
            status: "open".into(),
            created_at: timestamp(Utc::now()),
        })
        .unwrap();

        assert!(!admin.send_message(ticket_id, "admin-1", "   ").await);
        assert!(admin.send_message(ticket_id, "admin-1", "  We'll refund you.  ").await);
        // unknown ticket violates the foreign key
        assert!(!admin.send_message(Uuid::new_v4(), "admin-1", "hello").await);

        let messages = admin.load_ticket_messages(ticket_id).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "We'll refund you.");
        assert!(messages[0].is_admin);
    }

    fn drop_tables(db: &Database, sql: &str) {
        db.with_conn(|conn| Ok(conn.execute_batch(sql)?)).unwrap();
    }

    #[tokio::test]
    async fn stats_are_zeroed_when_a_count_fails() {
        let (admin, db, _rx) = admin();
        book(&db, "u1").await;
        assert_eq!(admin.load_stats().await.total_shipments, 1);

        drop_tables(&db, "DROP TABLE demo_requests");
        assert_eq!(admin.load_stats().await, AdminStats::default());
    }

    #[tokio::test]
    async fn shipment_list_error_is_empty_with_notice() {
        let (admin, db, mut rx) = admin();
        book(&db, "u1").await;
        drop_tables(&db, "DROP TABLE tracking_events; DROP TABLE booking;");

        assert!(admin.load_shipments().await.is_empty());
        let (title, envelope) = last_notice(&mut rx).unwrap();
        assert_eq!(title, "Error Loading Shipments");
        assert!(envelope.is_for("any-admin", true));
        assert!(!envelope.is_for("u1", false));
    }

    #[tokio::test]
    async fn ticket_list_error_is_empty_with_notice() {
        let (admin, db, mut rx) = admin();
        drop_tables(&db, "DROP TABLE support_messages; DROP TABLE support_tickets;");

        assert!(admin.load_support_tickets().await.is_empty());
        assert_eq!(last_notice(&mut rx).unwrap().0, "Error Loading Support Tickets");
        assert!(admin.load_ticket_messages(Uuid::new_v4()).await.is_empty());
    }

    #[tokio::test]
    async fn status_change_database_error_returns_false_with_notice() {
        let (admin, db, mut rx) = admin();
        let id = book(&db, "owner").await;
        drop_tables(&db, "DROP TABLE tracking_events");

        assert!(!admin.change_shipment_status(id, ShipmentStatus::Delivered).await);
        assert_eq!(last_notice(&mut rx).unwrap().0, "Status Update Failed");
        // the status change rolled back with the event
        assert_eq!(db.get_booking(&id.to_string()).unwrap().unwrap().status, "pending");

        drop_tables(&db, "DROP TABLE demo_requests");
        assert!(!admin.change_demo_status(Uuid::new_v4(), RequestStatus::Scheduled).await);
        assert_eq!(last_notice(&mut rx).unwrap().0, "Status Update Failed");
        assert!(admin.load_demo_requests().await.is_empty());
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("demo request"), "Demo request");
        assert_eq!(capitalize(""), "");
    }
}
