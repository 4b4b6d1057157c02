mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use parcel_api::AppStateInner;
use parcel_db::Database;
use parcel_gateway::dispatcher::Dispatcher;
use parcel_services::admin::AdminData;
use parcel_services::booking::BookingService;
use parcel_services::carrier::http::HttpCarrier;
use parcel_services::carrier::simulated::SimulatedCarrier;
use parcel_services::carrier::{LabelService, PickupService};
use parcel_services::pricing::BookingConfig;
use parcel_services::store::{DatabaseStore, LocalStore, ShipmentStore};
use parcel_services::support::SupportService;
use parcel_services::sync;

use crate::config::Config;

const DEFAULT_LOG_FILTER: &str =
    "parcelport=debug,parcel_api=debug,parcel_services=debug,parcel_gateway=debug,parcel_db=debug,tower_http=debug";

/// Where simulated labels claim to live.
const SIMULATED_LABEL_BASE_URL: &str = "https://labels.e-parcel-nordic.example";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let fallback = Arc::new(LocalStore::new(config.fallback_dir.clone()).await?);
    let primary: Arc<dyn ShipmentStore> = Arc::new(DatabaseStore::new(db.clone()));

    let (labels, pickups): (Arc<dyn LabelService>, Arc<dyn PickupService>) = match &config.carrier_api_url {
        Some(url) => {
            info!("Using carrier API at {}", url);
            let carrier = Arc::new(HttpCarrier::new(url)?);
            (carrier.clone() as Arc<dyn LabelService>, carrier as Arc<dyn PickupService>)
        }
        None => {
            warn!("PARCEL_CARRIER_API_URL not set; using the simulated carrier");
            let carrier = Arc::new(SimulatedCarrier::new(SIMULATED_LABEL_BASE_URL));
            (carrier.clone() as Arc<dyn LabelService>, carrier as Arc<dyn PickupService>)
        }
    };

    // Replay bookings that only reached the fallback store
    tokio::spawn(sync::run_fallback_sync_loop(
        fallback.clone(),
        db.clone(),
        primary.clone(),
        config.sync_interval_secs,
    ));

    let dispatcher = Dispatcher::new();
    let booking_config = BookingConfig {
        compliance_surcharge_cents: config.compliance_surcharge_cents,
        cancellation_window: chrono::Duration::hours(config.cancellation_window_hours),
    };

    let state = Arc::new(AppStateInner {
        bookings: BookingService::new(
            db.clone(),
            labels,
            pickups,
            primary,
            fallback,
            dispatcher.clone(),
            booking_config,
        ),
        admin: AdminData::new(db.clone(), dispatcher.clone()),
        support: SupportService::new(db, dispatcher.clone()),
        dispatcher,
        jwt_secret: config.jwt_secret.clone(),
        cors_origins: config.cors_origins.clone(),
    });

    let app = parcel_api::app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Parcel portal listening on {}", addr);
    if config.cors_origins.is_empty() {
        warn!("PARCEL_CORS_ORIGINS not set; allowing requests from any origin");
    }
    info!(
        "Compliance surcharge {} cents, cancellation window {} hours",
        config.compliance_surcharge_cents, config.cancellation_window_hours
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
