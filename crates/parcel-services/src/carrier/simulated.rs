use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};
use tracing::info;
use uuid::Uuid;

use parcel_types::models::PickupSlot;

use super::{Label, LabelRequest, LabelService, PickupConfirmation, PickupRequest, PickupService};
use crate::error::CarrierError;

/// How far ahead the simulated carrier looks for a free pickup slot.
const SLOT_HORIZON_DAYS: u64 = 14;

/// Pickup windows offered on each weekday, in UTC hours.
const WINDOWS: [(&str, u32, u32); 2] = [("am", 9, 12), ("pm", 13, 16)];

/// In-process stand-in for a carrier: issues label URLs under a fixed base
/// and offers morning and afternoon pickup windows on weekdays.
pub struct SimulatedCarrier {
    label_base_url: String,
}

impl SimulatedCarrier {
    pub fn new(label_base_url: impl Into<String>) -> Self {
        Self {
            label_base_url: label_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Every window on `date`, whether or not it is still in the future.
    pub fn slots_for(date: NaiveDate) -> Vec<PickupSlot> {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Vec::new();
        }

        WINDOWS
            .iter()
            .filter_map(|(part, start, end)| {
                let starts_at = date.and_time(NaiveTime::from_hms_opt(*start, 0, 0)?).and_utc();
                let ends_at = date.and_time(NaiveTime::from_hms_opt(*end, 0, 0)?).and_utc();
                Some(PickupSlot {
                    id: format!("{}-{}", date.format("%Y-%m-%d"), part),
                    starts_at,
                    ends_at,
                })
            })
            .collect()
    }

    fn find_slot(slot_id: &str) -> Option<PickupSlot> {
        let (date, _) = slot_id.rsplit_once('-')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        Self::slots_for(date).into_iter().find(|slot| slot.id == slot_id)
    }

    fn next_open_slot() -> Option<PickupSlot> {
        let now = Utc::now();
        let today = now.date_naive();
        (0..SLOT_HORIZON_DAYS)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .flat_map(Self::slots_for)
            .find(|slot| slot.starts_at > now)
    }
}

#[async_trait]
impl LabelService for SimulatedCarrier {
    async fn generate_label(&self, request: &LabelRequest) -> Result<Label, CarrierError> {
        if request.weight_kg <= 0.0 {
            return Err(CarrierError::Rejected("package weight must be positive".into()));
        }

        let label_url = format!(
            "{}/{}.pdf?lang={}",
            self.label_base_url, request.tracking_code, request.language
        );
        info!(
            "Simulated label for shipment {} ({}, {})",
            request.shipment_id, request.carrier_name, request.dimensions
        );
        Ok(Label { label_url })
    }

    async fn void_label(&self, shipment_id: Uuid) -> Result<(), CarrierError> {
        info!("Simulated label voided for shipment {}", shipment_id);
        Ok(())
    }
}

#[async_trait]
impl PickupService for SimulatedCarrier {
    async fn available_slots(&self, date: NaiveDate) -> Result<Vec<PickupSlot>, CarrierError> {
        let now = Utc::now();
        Ok(Self::slots_for(date)
            .into_iter()
            .filter(|slot| slot.starts_at > now)
            .collect())
    }

    async fn schedule_pickup(&self, request: &PickupRequest) -> Result<PickupConfirmation, CarrierError> {
        let slot = match &request.slot_id {
            Some(slot_id) => Self::find_slot(slot_id).filter(|slot| slot.starts_at > Utc::now()),
            None => Self::next_open_slot(),
        };

        Ok(match slot {
            Some(slot) => {
                info!(
                    "Simulated pickup for shipment {} at {} ({})",
                    request.shipment_id, slot.starts_at, request.pickup_address
                );
                PickupConfirmation {
                    confirmed: true,
                    pickup_time: Some(slot.starts_at),
                }
            }
            None => PickupConfirmation {
                confirmed: false,
                pickup_time: None,
            },
        })
    }

    async fn cancel_pickup(&self, shipment_id: Uuid) -> Result<(), CarrierError> {
        info!("Simulated pickup cancelled for shipment {}", shipment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pickup(slot_id: Option<&str>) -> PickupRequest {
        PickupRequest {
            shipment_id: Uuid::new_v4(),
            carrier_name: "E-Parcel Nordic".into(),
            pickup_address: "Stockholm".into(),
            slot_id: slot_id.map(str::to_string),
        }
    }

    #[test]
    fn weekdays_have_two_windows_weekends_none() {
        // 2026-10-16 is a Friday
        let friday = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let slots = SimulatedCarrier::slots_for(friday);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, "2026-10-16-am");
        assert!(slots[0].starts_at < slots[0].ends_at);

        let saturday = friday.succ_opt().unwrap();
        assert!(SimulatedCarrier::slots_for(saturday).is_empty());
    }

    #[tokio::test]
    async fn schedules_next_open_slot_by_default() {
        let carrier = SimulatedCarrier::new("https://labels.test/");
        let confirmation = carrier.schedule_pickup(&pickup(None)).await.unwrap();
        assert!(confirmation.confirmed);
        assert!(confirmation.pickup_time.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn unknown_or_past_slot_is_not_confirmed() {
        let carrier = SimulatedCarrier::new("https://labels.test");
        for slot in ["nonsense", "2020-01-06-am", "2030-01-07-night"] {
            let confirmation = carrier.schedule_pickup(&pickup(Some(slot))).await.unwrap();
            assert!(!confirmation.confirmed, "slot {slot} should not confirm");
            assert_eq!(confirmation.pickup_time, None);
        }
    }

    #[tokio::test]
    async fn label_url_uses_tracking_code() {
        let carrier = SimulatedCarrier::new("https://labels.test/");
        let label = carrier
            .generate_label(&LabelRequest {
                shipment_id: Uuid::new_v4(),
                carrier_name: "E-Parcel Nordic".into(),
                tracking_code: "EPNABC123".into(),
                sender_address: "Stockholm".into(),
                recipient_address: "Helsinki".into(),
                weight_kg: 2.5,
                dimensions: "30x20x10 cm".into(),
                language: "sv".into(),
            })
            .await
            .unwrap();
        assert_eq!(label.label_url, "https://labels.test/EPNABC123.pdf?lang=sv");
    }
}
