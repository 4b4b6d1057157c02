use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use parcel_db::{Database, timestamp};
use parcel_gateway::dispatcher::Dispatcher;
use parcel_types::api::{BookingConfirmation, BookingRequest, QuoteResponse, TrackingResponse};
use parcel_types::events::GatewayEvent;
use parcel_types::models::{
    CustomerType, DeliverySpeed, PickupSlot, Shipment, ShipmentStatus,
};

use crate::blocking;
use crate::carrier::{LabelRequest, LabelService, PickupConfirmation, PickupRequest, PickupService};
use crate::convert::{collect_valid, shipment_from_row, tracking_event_from_row};
use crate::error::{BookingError, CarrierError};
use crate::pricing::{self, BookingConfig};
use crate::store::ShipmentStore;

const TRACKING_CODE_ATTEMPTS: usize = 5;

/// Runs the booking saga (label → pickup → price → persist) and the
/// customer-side operations on existing bookings.
pub struct BookingService {
    db: Arc<Database>,
    labels: Arc<dyn LabelService>,
    pickups: Arc<dyn PickupService>,
    primary: Arc<dyn ShipmentStore>,
    fallback: Arc<dyn ShipmentStore>,
    dispatcher: Dispatcher,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(
        db: Arc<Database>,
        labels: Arc<dyn LabelService>,
        pickups: Arc<dyn PickupService>,
        primary: Arc<dyn ShipmentStore>,
        fallback: Arc<dyn ShipmentStore>,
        dispatcher: Dispatcher,
        config: BookingConfig,
    ) -> Self {
        Self {
            db,
            labels,
            pickups,
            primary,
            fallback,
            dispatcher,
            config,
        }
    }

    pub fn quote(&self, customer_type: CustomerType, speed: DeliverySpeed) -> QuoteResponse {
        QuoteResponse {
            carrier: pricing::carrier_quote(customer_type),
            eta_days: speed.transit_days(),
            compliance_surcharge_cents: self.config.compliance_surcharge_cents,
        }
    }

    pub async fn pickup_slots(&self, date: NaiveDate) -> Result<Vec<PickupSlot>, CarrierError> {
        self.pickups.available_slots(date).await
    }

    /// Book a shipment for `user_id`. Any failure is also pushed to the
    /// user as a "Booking Failed" notice.
    pub async fn book_shipment(
        &self,
        user_id: &str,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        let result = self.run_booking(user_id, request).await;
        if let Err(e) = &result {
            self.dispatcher
                .notify_user(user_id, GatewayEvent::failure("Booking Failed", e.to_string()));
        }
        result
    }

    async fn run_booking(
        &self,
        user_id: &str,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        validate(&request)?;

        let shipment_id = pricing::generate_shipment_id();
        let tracking_code = self.fresh_tracking_code().await;
        info!("Booking shipment {} ({}) for {}", shipment_id, tracking_code, user_id);

        // Step 1: label
        let label = self
            .labels
            .generate_label(&LabelRequest {
                shipment_id,
                carrier_name: request.carrier.name.clone(),
                tracking_code: tracking_code.clone(),
                sender_address: request.pickup.clone(),
                recipient_address: request.delivery.clone(),
                weight_kg: request.weight_kg,
                dimensions: request.dimensions.to_string(),
                language: request.label_language.clone(),
            })
            .await
            .map_err(|e| {
                error!("Label generation failed for {}: {}", shipment_id, e);
                BookingError::Label(e)
            })?;

        // Step 2: pickup
        let pickup = self
            .pickups
            .schedule_pickup(&PickupRequest {
                shipment_id,
                carrier_name: request.carrier.name.clone(),
                pickup_address: request.pickup.clone(),
                slot_id: request.pickup_slot_id.clone(),
            })
            .await;

        let pickup_time = match pickup {
            Ok(PickupConfirmation {
                confirmed: true,
                pickup_time: Some(at),
            }) => at,
            Ok(_) => {
                warn!("Pickup not confirmed for {}", shipment_id);
                self.void_label(shipment_id).await;
                return Err(BookingError::Pickup(CarrierError::Rejected(
                    "pickup was not confirmed".into(),
                )));
            }
            Err(e) => {
                error!("Pickup scheduling failed for {}: {}", shipment_id, e);
                self.void_label(shipment_id).await;
                return Err(BookingError::Pickup(e));
            }
        };

        // Step 3: price and dates
        let now = Utc::now();
        let total_price_cents = pricing::total_price(
            request.carrier.price_cents,
            request.include_compliance,
            self.config.compliance_surcharge_cents,
        );
        let Some(estimated_delivery) = pricing::estimated_delivery(pickup_time, request.delivery_speed)
        else {
            error!("Pickup time {} for {} is out of range", pickup_time, shipment_id);
            self.compensate(shipment_id).await;
            return Err(BookingError::Pickup(CarrierError::Rejected(
                "pickup time out of range".into(),
            )));
        };
        let Some(cancellation_deadline) =
            pricing::cancellation_deadline(now, self.config.cancellation_window)
        else {
            error!(
                "Cancellation window {} overflows for {}",
                self.config.cancellation_window, shipment_id
            );
            self.compensate(shipment_id).await;
            return Err(BookingError::Schedule);
        };

        let shipment = Shipment {
            id: shipment_id,
            user_id: user_id.to_string(),
            tracking_code: tracking_code.clone(),
            customer_type: request.customer_type,
            business_name: request.business_name,
            vat_number: request.vat_number,
            pickup: request.pickup,
            delivery: request.delivery,
            sender: request.sender,
            recipient: request.recipient,
            weight_kg: request.weight_kg,
            dimensions: request.dimensions,
            carrier: request.carrier,
            delivery_speed: request.delivery_speed,
            include_compliance: request.include_compliance,
            label_url: label.label_url.clone(),
            pickup_time,
            total_price_cents,
            status: ShipmentStatus::Pending,
            estimated_delivery,
            cancellation_deadline,
            created_at: now,
            updated_at: now,
        };

        // Step 4: persist, falling back to local storage
        match self.primary.save(&shipment).await {
            Ok(()) => {
                info!("Booking {} saved to database", tracking_code);
                self.dispatcher.notify_user(
                    user_id,
                    GatewayEvent::notice(
                        "Booking Saved",
                        "Your shipment has been successfully recorded in our database.",
                    ),
                );
            }
            Err(primary) => {
                warn!("Database save failed for {}, using fallback: {}", tracking_code, primary);
                self.dispatcher.notify_user(
                    user_id,
                    GatewayEvent::failure(
                        "Database Save Warning",
                        "Could not save to primary database, using backup storage instead.",
                    ),
                );

                if let Err(fallback) = self.fallback.save(&shipment).await {
                    error!("Fallback save failed for {}: {}", tracking_code, fallback);
                    self.compensate(shipment_id).await;
                    return Err(BookingError::Persistence { primary, fallback });
                }
            }
        }

        Ok(BookingConfirmation {
            shipment_id,
            tracking_code,
            label_url: label.label_url,
            pickup_time,
            total_price_cents,
            estimated_delivery,
            cancellation_deadline,
        })
    }

    /// A tracking code not yet taken. If the database cannot be asked the
    /// candidate is used as is and the UNIQUE index has the final word.
    async fn fresh_tracking_code(&self) -> String {
        let mut code = pricing::generate_tracking_code();
        for _ in 0..TRACKING_CODE_ATTEMPTS {
            let candidate = code.clone();
            match blocking(&self.db, move |db| db.booking_exists(&candidate)).await {
                Ok(true) => code = pricing::generate_tracking_code(),
                Ok(false) => break,
                Err(e) => {
                    warn!("Could not check tracking code {}: {:#}", code, e);
                    break;
                }
            }
        }
        code
    }

    // -- Compensation (best-effort) --

    /// Undo both carrier steps once label and pickup exist.
    async fn compensate(&self, shipment_id: Uuid) {
        self.cancel_pickup(shipment_id).await;
        self.void_label(shipment_id).await;
    }

    async fn void_label(&self, shipment_id: Uuid) {
        if let Err(e) = self.labels.void_label(shipment_id).await {
            warn!("Could not void label for {}: {}", shipment_id, e);
        }
    }

    async fn cancel_pickup(&self, shipment_id: Uuid) {
        if let Err(e) = self.pickups.cancel_pickup(shipment_id).await {
            warn!("Could not cancel pickup for {}: {}", shipment_id, e);
        }
    }

    // -- Existing bookings --

    /// The caller's booking with this tracking code, if it exists.
    pub async fn get_booking(&self, tracking_code: &str, user_id: &str) -> anyhow::Result<Option<Shipment>> {
        let code = tracking_code.to_string();
        let row = blocking(&self.db, move |db| db.get_booking_by_tracking_code(&code)).await?;
        match row {
            Some(row) if row.user_id == user_id => Ok(Some(shipment_from_row(row)?)),
            _ => Ok(None),
        }
    }

    /// The caller's bookings, newest first.
    pub async fn list_shipments(&self, user_id: &str) -> anyhow::Result<Vec<Shipment>> {
        let uid = user_id.to_string();
        let rows = blocking(&self.db, move |db| db.list_bookings_for_user(&uid)).await?;
        Ok(collect_valid(rows, "booking", shipment_from_row))
    }

    /// Cancel a booking while its cancellation window is open. Returns
    /// whether it was cancelled; the outcome is also sent as a notice.
    pub async fn cancel_booking(&self, tracking_code: &str, user_id: &str) -> bool {
        match self.try_cancel(tracking_code, user_id).await {
            Ok(Some(shipment_id)) => {
                info!("Booking {} cancelled by {}", tracking_code, user_id);
                self.cancel_pickup(shipment_id).await;
                self.void_label(shipment_id).await;
                self.dispatcher.notify_user(
                    user_id,
                    GatewayEvent::notice("Booking Cancelled", "Your booking has been successfully cancelled."),
                );
                true
            }
            Ok(None) => {
                self.dispatcher.notify_user(
                    user_id,
                    GatewayEvent::failure(
                        "Cancellation Failed",
                        "Unable to cancel booking. Please try again or contact support.",
                    ),
                );
                false
            }
            Err(e) => {
                error!("Error cancelling booking {}: {}", tracking_code, e);
                self.dispatcher.notify_user(
                    user_id,
                    GatewayEvent::failure("Cancellation Error", "An unexpected error occurred."),
                );
                false
            }
        }
    }

    async fn try_cancel(&self, tracking_code: &str, user_id: &str) -> anyhow::Result<Option<Uuid>> {
        let code = tracking_code.to_string();
        let uid = user_id.to_string();
        let now = timestamp(Utc::now());
        blocking(&self.db, move |db| {
            let Some(row) = db.get_booking_by_tracking_code(&code)? else {
                return Ok(None);
            };
            if !db.delete_booking_before_deadline(&code, &uid, &now)? {
                return Ok(None);
            }
            Ok(Some(row.id.parse()?))
        })
        .await
    }

    /// Public tracking view: status and history, no personal details.
    pub async fn track(&self, tracking_code: &str) -> anyhow::Result<Option<TrackingResponse>> {
        let code = tracking_code.to_string();
        let found = blocking(&self.db, move |db| {
            let Some(row) = db.get_booking_by_tracking_code(&code)? else {
                return Ok(None);
            };
            let events = db.list_tracking_events(&row.id)?;
            Ok(Some((row, events)))
        })
        .await?;

        let Some((row, events)) = found else {
            return Ok(None);
        };
        let shipment = shipment_from_row(row)?;
        Ok(Some(TrackingResponse {
            tracking_code: shipment.tracking_code,
            status: shipment.status,
            carrier_name: shipment.carrier.name,
            estimated_delivery: shipment.estimated_delivery,
            events: collect_valid(events, "tracking event", tracking_event_from_row),
        }))
    }
}

fn validate(request: &BookingRequest) -> Result<(), BookingError> {
    let invalid = |msg: &str| Err(BookingError::Invalid(msg.to_string()));

    if !(request.weight_kg.is_finite() && request.weight_kg > 0.0) {
        return invalid("weight must be a positive number");
    }
    let dims = &request.dimensions;
    if dims.length == 0 || dims.width == 0 || dims.height == 0 {
        return invalid("dimensions must be positive");
    }
    if request.pickup.trim().is_empty() || request.delivery.trim().is_empty() {
        return invalid("pickup and delivery locations are required");
    }
    if let Some(field) = request.sender.missing_field() {
        return Err(BookingError::Invalid(format!("sender {} is required", field)));
    }
    if let Some(field) = request.recipient.missing_field() {
        return Err(BookingError::Invalid(format!("recipient {} is required", field)));
    }

    let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
    match request.customer_type {
        CustomerType::Business if blank(&request.business_name) || blank(&request.vat_number) => {
            return invalid("business name and VAT number are required for business accounts");
        }
        CustomerType::Ecommerce if blank(&request.business_name) => {
            return invalid("business name is required for e-commerce accounts");
        }
        _ => {}
    }

    if request.carrier != pricing::carrier_quote(request.customer_type) {
        return invalid("carrier offer does not match the current quote");
    }

    Ok(())
}
