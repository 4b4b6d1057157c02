use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use tracing::{debug, warn};
use uuid::Uuid;

use parcel_types::models::PickupSlot;

use super::{Label, LabelRequest, LabelService, PickupConfirmation, PickupRequest, PickupService};
use crate::error::CarrierError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Carrier API client.
///
/// Endpoints, relative to `base_url`:
/// `POST /labels`, `DELETE /labels/{shipment_id}`, `GET /pickups/slots?date=`,
/// `POST /pickups`, `DELETE /pickups/{shipment_id}`.
pub struct HttpCarrier {
    client: Client,
    base_url: String,
}

impl HttpCarrier {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CarrierError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-2xx response into `CarrierError::Rejected` carrying the body.
async fn check(response: Response) -> Result<Response, CarrierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Carrier API returned {}: {}", status, body);
    Err(CarrierError::Rejected(format!("{}: {}", status, body)))
}

#[async_trait]
impl LabelService for HttpCarrier {
    async fn generate_label(&self, request: &LabelRequest) -> Result<Label, CarrierError> {
        debug!("Requesting label for shipment {}", request.shipment_id);
        let response = self.client.post(self.url("/labels")).json(request).send().await?;
        Ok(check(response).await?.json::<Label>().await?)
    }

    async fn void_label(&self, shipment_id: Uuid) -> Result<(), CarrierError> {
        let response = self
            .client
            .delete(self.url(&format!("/labels/{}", shipment_id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PickupService for HttpCarrier {
    async fn available_slots(&self, date: NaiveDate) -> Result<Vec<PickupSlot>, CarrierError> {
        let response = self
            .client
            .get(self.url("/pickups/slots"))
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?;
        Ok(check(response).await?.json::<Vec<PickupSlot>>().await?)
    }

    async fn schedule_pickup(&self, request: &PickupRequest) -> Result<PickupConfirmation, CarrierError> {
        debug!("Requesting pickup for shipment {}", request.shipment_id);
        let response = self.client.post(self.url("/pickups")).json(request).send().await?;
        Ok(check(response).await?.json::<PickupConfirmation>().await?)
    }

    async fn cancel_pickup(&self, shipment_id: Uuid) -> Result<(), CarrierError> {
        let response = self
            .client
            .delete(self.url(&format!("/pickups/{}", shipment_id)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
