use crate::models::{
    BookingRow, CollaborationRow, DemoRequestRow, SupportMessageRow, TicketRow, TrackingEventRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

const BOOKING_COLUMNS: &str = "id, user_id, tracking_code, customer_type, business_name, vat_number,
    pickup, delivery, sender_details, recipient_details, weight_kg, length_cm, width_cm, height_cm,
    carrier_name, carrier_price_cents, delivery_speed, include_compliance, label_url, pickup_time,
    total_price_cents, status, estimated_delivery, cancellation_deadline, created_at, updated_at";

impl Database {
    // -- Bookings --

    /// Insert a booking together with its first tracking event, atomically.
    pub fn insert_booking(&self, row: &BookingRow, first_event: &TrackingEventRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO booking ({BOOKING_COLUMNS}) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                        ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
                ),
                rusqlite::params![
                    row.id,
                    row.user_id,
                    row.tracking_code,
                    row.customer_type,
                    row.business_name,
                    row.vat_number,
                    row.pickup,
                    row.delivery,
                    row.sender_details,
                    row.recipient_details,
                    row.weight_kg,
                    row.length_cm,
                    row.width_cm,
                    row.height_cm,
                    row.carrier_name,
                    row.carrier_price_cents,
                    row.delivery_speed,
                    row.include_compliance,
                    row.label_url,
                    row.pickup_time,
                    row.total_price_cents,
                    row.status,
                    row.estimated_delivery,
                    row.cancellation_deadline,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            insert_tracking_event(&tx, first_event)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn booking_exists(&self, tracking_code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM booking WHERE tracking_code = ?1",
                [tracking_code],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn get_booking(&self, id: &str) -> Result<Option<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = ?1"))?;
            stmt.query_row([id], booking_from_row).optional()
        })
    }

    pub fn get_booking_by_tracking_code(&self, tracking_code: &str) -> Result<Option<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM booking WHERE tracking_code = ?1"
            ))?;
            stmt.query_row([tracking_code], booking_from_row).optional()
        })
    }

    /// All bookings, newest first.
    pub fn list_bookings(&self) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM booking ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([], booking_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_bookings_for_user(&self, user_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM booking WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], booking_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Count bookings whose status is one of `statuses`; an empty slice counts all.
    pub fn count_bookings(&self, statuses: &[&str]) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = if statuses.is_empty() {
                conn.query_row("SELECT COUNT(*) FROM booking", [], |row| row.get(0))?
            } else {
                let placeholders: Vec<String> =
                    (1..=statuses.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "SELECT COUNT(*) FROM booking WHERE status IN ({})",
                    placeholders.join(", ")
                );
                conn.query_row(&sql, rusqlite::params_from_iter(statuses.iter()), |row| row.get(0))?
            };
            Ok(count as u64)
        })
    }

    /// Set a booking's status and append `event` in one transaction.
    /// Returns false, without recording the event, when no booking has this id.
    pub fn update_booking_status(
        &self,
        id: &str,
        status: &str,
        updated_at: &str,
        event: &TrackingEventRow,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE booking SET status = ?1, updated_at = ?2 WHERE id = ?3",
                (status, updated_at, id),
            )?;
            if changed == 0 {
                return Ok(false);
            }
            insert_tracking_event(&tx, event)?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Remove a booking owned by `user_id` whose cancellation deadline is
    /// still after `now`. Returns whether a row was removed.
    pub fn delete_booking_before_deadline(
        &self,
        tracking_code: &str,
        user_id: &str,
        now: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM booking
                 WHERE tracking_code = ?1 AND user_id = ?2 AND cancellation_deadline > ?3",
                (tracking_code, user_id, now),
            )?;
            Ok(removed > 0)
        })
    }

    // -- Tracking events --

    /// Tracking history for a booking, oldest first.
    pub fn list_tracking_events(&self, booking_id: &str) -> Result<Vec<TrackingEventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT booking_id, occurred_at, location, status, description
                 FROM tracking_events WHERE booking_id = ?1
                 ORDER BY occurred_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([booking_id], |row| {
                    Ok(TrackingEventRow {
                        booking_id: row.get(0)?,
                        occurred_at: row.get(1)?,
                        location: row.get(2)?,
                        status: row.get(3)?,
                        description: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Support tickets --

    pub fn insert_ticket(&self, ticket: &TicketRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO support_tickets (id, user_id, subject, message, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    ticket.id,
                    ticket.user_id,
                    ticket.subject,
                    ticket.message,
                    ticket.status,
                    ticket.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_ticket(&self, id: &str) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, subject, message, status, created_at
                 FROM support_tickets WHERE id = ?1",
                [id],
                ticket_from_row,
            )
            .optional()
        })
    }

    pub fn list_tickets(&self) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, subject, message, status, created_at
                 FROM support_tickets ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], ticket_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_tickets_for_user(&self, user_id: &str) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, subject, message, status, created_at
                 FROM support_tickets WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], ticket_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_tickets(&self, status: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| count_rows(conn, "support_tickets", status))
    }

    pub fn update_ticket_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| update_status(conn, "support_tickets", id, status))
    }

    pub fn insert_support_message(&self, message: &SupportMessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO support_messages (id, ticket_id, user_id, message, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    message.id,
                    message.ticket_id,
                    message.user_id,
                    message.message,
                    message.is_admin,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Messages on a ticket, oldest first.
    pub fn list_ticket_messages(&self, ticket_id: &str) -> Result<Vec<SupportMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, user_id, message, is_admin, created_at
                 FROM support_messages WHERE ticket_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([ticket_id], |row| {
                    Ok(SupportMessageRow {
                        id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        user_id: row.get(2)?,
                        message: row.get(3)?,
                        is_admin: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Demo requests --

    pub fn insert_demo_request(&self, request: &DemoRequestRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO demo_requests (id, name, email, company, message, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    request.id,
                    request.name,
                    request.email,
                    request.company,
                    request.message,
                    request.status,
                    request.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_demo_requests(&self) -> Result<Vec<DemoRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, company, message, status, created_at
                 FROM demo_requests ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(DemoRequestRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        company: row.get(3)?,
                        message: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_demo_requests(&self) -> Result<u64> {
        self.with_conn(|conn| count_rows(conn, "demo_requests", None))
    }

    pub fn update_demo_request_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| update_status(conn, "demo_requests", id, status))
    }

    // -- Collaborations --

    pub fn insert_collaboration(&self, request: &CollaborationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO collaborations (id, name, email, company, proposal, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    request.id,
                    request.name,
                    request.email,
                    request.company,
                    request.proposal,
                    request.status,
                    request.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_collaborations(&self) -> Result<Vec<CollaborationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, company, proposal, status, created_at
                 FROM collaborations ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CollaborationRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        company: row.get(3)?,
                        proposal: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_collaborations(&self) -> Result<u64> {
        self.with_conn(|conn| count_rows(conn, "collaborations", None))
    }

    pub fn update_collaboration_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| update_status(conn, "collaborations", id, status))
    }
}

fn insert_tracking_event(conn: &Connection, event: &TrackingEventRow) -> Result<()> {
    conn.execute(
        "INSERT INTO tracking_events (booking_id, occurred_at, location, status, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &event.booking_id,
            &event.occurred_at,
            &event.location,
            &event.status,
            &event.description,
        ),
    )?;
    Ok(())
}

/// `table` is always one of this module's literal table names.
fn count_rows(conn: &Connection, table: &str, status: Option<&str>) -> Result<u64> {
    let count: i64 = match status {
        Some(status) => conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE status = ?1"),
            [status],
            |row| row.get(0),
        )?,
        None => conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?,
    };
    Ok(count as u64)
}

fn update_status(conn: &Connection, table: &str, id: &str, status: &str) -> Result<bool> {
    let changed = conn.execute(
        &format!("UPDATE {table} SET status = ?1 WHERE id = ?2"),
        (status, id),
    )?;
    Ok(changed > 0)
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tracking_code: row.get(2)?,
        customer_type: row.get(3)?,
        business_name: row.get(4)?,
        vat_number: row.get(5)?,
        pickup: row.get(6)?,
        delivery: row.get(7)?,
        sender_details: row.get(8)?,
        recipient_details: row.get(9)?,
        weight_kg: row.get(10)?,
        length_cm: row.get(11)?,
        width_cm: row.get(12)?,
        height_cm: row.get(13)?,
        carrier_name: row.get(14)?,
        carrier_price_cents: row.get(15)?,
        delivery_speed: row.get(16)?,
        include_compliance: row.get(17)?,
        label_url: row.get(18)?,
        pickup_time: row.get(19)?,
        total_price_cents: row.get(20)?,
        status: row.get(21)?,
        estimated_delivery: row.get(22)?,
        cancellation_deadline: row.get(23)?,
        created_at: row.get(24)?,
        updated_at: row.get(25)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<TicketRow> {
    Ok(TicketRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        subject: row.get(2)?,
        message: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(id: &str, tracking_code: &str, user_id: &str, created_at: &str) -> BookingRow {
        BookingRow {
            id: id.into(),
            user_id: user_id.into(),
            tracking_code: tracking_code.into(),
            customer_type: "private".into(),
            business_name: None,
            vat_number: None,
            pickup: "Stockholm".into(),
            delivery: "Helsinki".into(),
            sender_details: "{}".into(),
            recipient_details: "{}".into(),
            weight_kg: 5.0,
            length_cm: 30,
            width_cm: 20,
            height_cm: 10,
            carrier_name: "E-Parcel Nordic".into(),
            carrier_price_cents: 1000,
            delivery_speed: "standard".into(),
            include_compliance: false,
            label_url: "https://labels.test/a.pdf".into(),
            pickup_time: "2026-10-19T09:00:00.000000Z".into(),
            total_price_cents: 1000,
            status: "pending".into(),
            estimated_delivery: "2026-10-22T09:00:00.000000Z".into(),
            cancellation_deadline: "2026-10-17T12:00:00.000000Z".into(),
            created_at: created_at.into(),
            updated_at: created_at.into(),
        }
    }

    fn first_event(booking_id: &str, at: &str) -> TrackingEventRow {
        TrackingEventRow {
            booking_id: booking_id.into(),
            occurred_at: at.into(),
            location: "Stockholm".into(),
            status: "Pending".into(),
            description: "Shipment booked".into(),
        }
    }

    fn status_event(booking_id: &str, at: &str, status: &str) -> TrackingEventRow {
        TrackingEventRow {
            booking_id: booking_id.into(),
            occurred_at: at.into(),
            location: "Helsinki".into(),
            status: status.into(),
            description: format!("Status changed to {status}"),
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        for (id, code, user, at) in [
            ("b1", "EP0000000001", "user-a", "2026-10-16T10:00:00.000000Z"),
            ("b2", "EP0000000002", "user-b", "2026-10-16T11:00:00.000000Z"),
            ("b3", "EP0000000003", "user-a", "2026-10-16T12:00:00.000000Z"),
        ] {
            db.insert_booking(&booking(id, code, user, at), &first_event(id, at)).unwrap();
        }
        db
    }

    #[test]
    fn bookings_list_newest_first() {
        let db = seeded();
        let ids: Vec<String> = db.list_bookings().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["b3", "b2", "b1"]);

        let own: Vec<String> = db
            .list_bookings_for_user("user-a")
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(own, ["b3", "b1"]);
    }

    #[test]
    fn duplicate_tracking_code_is_rejected() {
        let db = seeded();
        let dup = booking("b9", "EP0000000001", "user-c", "2026-10-16T13:00:00.000000Z");
        assert!(db.insert_booking(&dup, &first_event("b9", &dup.created_at)).is_err());
        // the failed insert must not leave its tracking event behind
        assert!(db.list_tracking_events("b9").unwrap().is_empty());
    }

    #[test]
    fn count_bookings_filters_by_status() {
        let db = seeded();
        let at = "2026-10-18T00:00:00.000000Z";
        db.update_booking_status("b2", "delivered", at, &status_event("b2", at, "Delivered")).unwrap();

        assert_eq!(db.count_bookings(&[]).unwrap(), 3);
        assert_eq!(db.count_bookings(&["delivered"]).unwrap(), 1);
        assert_eq!(db.count_bookings(&["pending", "picked_up", "in_transit"]).unwrap(), 2);
    }

    #[test]
    fn status_update_reports_missing_row_and_bad_value() {
        let db = seeded();
        assert!(!db
            .update_booking_status("nope", "delivered", "now", &status_event("nope", "now", "Delivered"))
            .unwrap());
        assert!(db.list_tracking_events("nope").unwrap().is_empty());
        // CHECK constraint keeps statuses inside the fixed set
        assert!(db
            .update_booking_status("b1", "lost", "now", &status_event("b1", "now", "Lost"))
            .is_err());
        assert_eq!(db.list_tracking_events("b1").unwrap().len(), 1);
    }

    #[test]
    fn status_update_rolls_back_when_event_cannot_be_written() {
        let db = seeded();
        db.with_conn(|conn| Ok(conn.execute_batch("DROP TABLE tracking_events")?))
            .unwrap();

        let at = "2026-10-18T00:00:00.000000Z";
        assert!(db
            .update_booking_status("b1", "delivered", at, &status_event("b1", at, "Delivered"))
            .is_err());

        let row = db.get_booking("b1").unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.updated_at, "2026-10-16T10:00:00.000000Z");
    }

    #[test]
    fn status_update_appends_tracking_event() {
        let db = seeded();
        let at = "2026-10-18T00:00:00.000000Z";
        assert!(db
            .update_booking_status("b1", "in_transit", at, &status_event("b1", at, "In Transit"))
            .unwrap());

        let events = db.list_tracking_events("b1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].status, "In Transit");
        assert_eq!(db.get_booking("b1").unwrap().unwrap().status, "in_transit");
    }

    #[test]
    fn cancellation_respects_owner_and_deadline() {
        let db = seeded();
        let before = "2026-10-17T00:00:00.000000Z";
        let after = "2026-10-18T00:00:00.000000Z";

        assert!(!db.delete_booking_before_deadline("EP0000000001", "user-b", before).unwrap());
        assert!(!db.delete_booking_before_deadline("EP0000000001", "user-a", after).unwrap());
        assert!(db.delete_booking_before_deadline("EP0000000001", "user-a", before).unwrap());
        assert!(db.get_booking_by_tracking_code("EP0000000001").unwrap().is_none());
        // events cascade with the booking
        assert!(db.list_tracking_events("b1").unwrap().is_empty());
    }

    #[test]
    fn ticket_messages_are_chronological() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ticket(&TicketRow {
            id: "t1".into(),
            user_id: "user-a".into(),
            subject: "Late parcel".into(),
            message: "Where is it?".into(),
            status: "open".into(),
            created_at: "2026-10-16T10:00:00.000000Z".into(),
        })
        .unwrap();

        for (id, at, is_admin) in [
            ("m2", "2026-10-16T10:05:00.000000Z", true),
            ("m1", "2026-10-16T10:01:00.000000Z", false),
        ] {
            db.insert_support_message(&SupportMessageRow {
                id: id.into(),
                ticket_id: "t1".into(),
                user_id: "someone".into(),
                message: "hi".into(),
                is_admin,
                created_at: at.into(),
            })
            .unwrap();
        }

        let messages = db.list_ticket_messages("t1").unwrap();
        assert_eq!(messages.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["m1", "m2"]);
        assert!(messages[1].is_admin);

        assert_eq!(db.count_tickets(Some("open")).unwrap(), 1);
        assert!(db.update_ticket_status("t1", "closed").unwrap());
        assert_eq!(db.count_tickets(Some("open")).unwrap(), 0);
        assert_eq!(db.count_tickets(None).unwrap(), 1);
    }

    #[test]
    fn message_for_unknown_ticket_violates_foreign_key() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_support_message(&SupportMessageRow {
            id: "m1".into(),
            ticket_id: "missing".into(),
            user_id: "u".into(),
            message: "hi".into(),
            is_admin: false,
            created_at: "2026-10-16T10:00:00.000000Z".into(),
        });
        assert!(result.is_err());
    }
}
