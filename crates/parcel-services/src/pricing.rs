use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::Rng;
use uuid::Uuid;

use parcel_types::models::{Carrier, CustomerType, DeliverySpeed};

pub const CARRIER_NAME: &str = "E-Parcel Nordic";

const TRACKING_PREFIX: &str = "EPN";
const TRACKING_SUFFIX_LEN: usize = 9;
/// Uppercase letters and digits without look-alikes (0/O, 1/I).
const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Knobs for pricing and the cancellation window.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub compliance_surcharge_cents: i64,
    pub cancellation_window: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            compliance_surcharge_cents: 200,
            cancellation_window: Duration::hours(24),
        }
    }
}

/// The offer for a customer type: business and e-commerce accounts get
/// cheaper base prices than private senders.
pub fn carrier_quote(customer_type: CustomerType) -> Carrier {
    let price_cents = match customer_type {
        CustomerType::Business => 900,
        CustomerType::Ecommerce => 800,
        CustomerType::Private => 1000,
    };
    Carrier {
        name: CARRIER_NAME.to_string(),
        price_cents,
    }
}

pub fn total_price(carrier_price_cents: i64, include_compliance: bool, surcharge_cents: i64) -> i64 {
    if include_compliance {
        carrier_price_cents + surcharge_cents
    } else {
        carrier_price_cents
    }
}

/// Pickup time plus the speed tier's transit days, counting weekdays only.
/// `None` if the result falls outside the representable range.
pub fn estimated_delivery(pickup_time: DateTime<Utc>, speed: DeliverySpeed) -> Option<DateTime<Utc>> {
    let mut remaining = speed.transit_days();
    let mut at = pickup_time;
    while remaining > 0 {
        at = at.checked_add_signed(Duration::days(1))?;
        if !matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    Some(at)
}

pub fn cancellation_deadline(booked_at: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    booked_at.checked_add_signed(window)
}

pub fn generate_shipment_id() -> Uuid {
    Uuid::new_v4()
}

/// e.g. `EPNK7Q2M9XWD`
pub fn generate_tracking_code() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..TRACKING_SUFFIX_LEN)
        .map(|_| TRACKING_ALPHABET[rng.random_range(0..TRACKING_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", TRACKING_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn compliance_adds_surcharge() {
        assert_eq!(total_price(1000, false, 200), 1000);
        assert_eq!(total_price(1000, true, 200), 1200);
        assert_eq!(total_price(carrier_quote(CustomerType::Ecommerce).price_cents, true, 350), 1150);
    }

    #[test]
    fn quotes_by_customer_type() {
        assert_eq!(carrier_quote(CustomerType::Private).price_cents, 1000);
        assert_eq!(carrier_quote(CustomerType::Business).price_cents, 900);
        assert_eq!(carrier_quote(CustomerType::Ecommerce).name, CARRIER_NAME);
    }

    #[test]
    fn delivery_estimate_skips_weekends() {
        // Thursday 09:00
        let thursday = Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap();

        let express = estimated_delivery(thursday, DeliverySpeed::Express);
        assert_eq!(express, Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).single());

        // Fri, (Sat, Sun skipped), Mon, Tue
        let standard = estimated_delivery(thursday, DeliverySpeed::Standard);
        assert_eq!(standard, Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).single());

        let economy = estimated_delivery(thursday, DeliverySpeed::Economy);
        assert_eq!(economy, Utc.with_ymd_and_hms(2026, 10, 22, 9, 0, 0).single());
    }

    #[test]
    fn out_of_range_dates_are_none() {
        assert_eq!(estimated_delivery(DateTime::<Utc>::MAX_UTC, DeliverySpeed::Express), None);

        let now = Utc::now();
        assert_eq!(cancellation_deadline(now, Duration::hours(24)), Some(now + Duration::hours(24)));
        assert_eq!(cancellation_deadline(DateTime::<Utc>::MAX_UTC, Duration::hours(1)), None);
    }

    #[test]
    fn tracking_codes_have_expected_shape() {
        let code = generate_tracking_code();
        assert_eq!(code.len(), TRACKING_PREFIX.len() + TRACKING_SUFFIX_LEN);
        assert!(code.starts_with(TRACKING_PREFIX));
        assert!(code[TRACKING_PREFIX.len()..]
            .bytes()
            .all(|b| TRACKING_ALPHABET.contains(&b)));
        assert_ne!(generate_tracking_code(), code);
    }
}
