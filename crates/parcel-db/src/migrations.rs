use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (bookings, support, requests)");
        conn.execute_batch(
            "
            CREATE TABLE booking (
                id                      TEXT PRIMARY KEY,
                user_id                 TEXT NOT NULL,
                tracking_code           TEXT NOT NULL UNIQUE,
                customer_type           TEXT NOT NULL,
                business_name           TEXT,
                vat_number              TEXT,
                pickup                  TEXT NOT NULL,
                delivery                TEXT NOT NULL,
                sender_details          TEXT NOT NULL,
                recipient_details       TEXT NOT NULL,
                weight_kg               REAL NOT NULL,
                length_cm               INTEGER NOT NULL,
                width_cm                INTEGER NOT NULL,
                height_cm               INTEGER NOT NULL,
                carrier_name            TEXT NOT NULL,
                carrier_price_cents     INTEGER NOT NULL,
                delivery_speed          TEXT NOT NULL,
                include_compliance      INTEGER NOT NULL DEFAULT 0,
                label_url               TEXT NOT NULL,
                pickup_time             TEXT NOT NULL,
                total_price_cents       INTEGER NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'picked_up', 'in_transit', 'delivered', 'exception')),
                estimated_delivery      TEXT NOT NULL,
                cancellation_deadline   TEXT NOT NULL,
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL
            );

            CREATE INDEX idx_booking_user ON booking(user_id, created_at);
            CREATE INDEX idx_booking_status ON booking(status);

            CREATE TABLE tracking_events (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                booking_id   TEXT NOT NULL REFERENCES booking(id) ON DELETE CASCADE,
                occurred_at  TEXT NOT NULL,
                location     TEXT NOT NULL,
                status       TEXT NOT NULL,
                description  TEXT NOT NULL
            );

            CREATE INDEX idx_tracking_events_booking ON tracking_events(booking_id, occurred_at);

            CREATE TABLE support_tickets (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                subject     TEXT NOT NULL,
                message     TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'open'
                    CHECK (status IN ('open', 'in_progress', 'resolved', 'closed')),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE support_messages (
                id          TEXT PRIMARY KEY,
                ticket_id   TEXT NOT NULL REFERENCES support_tickets(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                message     TEXT NOT NULL,
                is_admin    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_support_messages_ticket ON support_messages(ticket_id, created_at);

            CREATE TABLE demo_requests (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                company     TEXT,
                message     TEXT,
                status      TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'scheduled', 'completed', 'cancelled')),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE collaborations (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                company     TEXT,
                proposal    TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'scheduled', 'completed', 'cancelled')),
                created_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
