use thiserror::Error;

/// Failures reported by a label or pickup provider.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("carrier rejected the request: {0}")]
    Rejected(String),

    #[error("pickup slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("carrier request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failures writing a shipment record to a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a booking did not go through. The `Display` text is the message
/// returned to the customer.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Invalid booking request: {0}")]
    Invalid(String),

    #[error("Failed to generate shipping label")]
    Label(#[source] CarrierError),

    #[error("Failed to schedule pickup")]
    Pickup(#[source] CarrierError),

    /// The cancellation deadline cannot be represented.
    #[error("Failed to calculate shipment dates")]
    Schedule,

    #[error("Failed to save shipment data")]
    Persistence {
        primary: StoreError,
        #[source]
        fallback: StoreError,
    },
}

/// Failures on support tickets and public submissions.
#[derive(Debug, Error)]
pub enum SupportError {
    #[error("{0}")]
    Invalid(String),

    #[error("ticket not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}
