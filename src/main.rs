// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::application::monitoring_service::MonitoringService;
use crate::domain::estimator::ChargeEstimator;
use crate::domain::ocv::OcvTable;
use crate::infrastructure::config::load_bms_config;
use crate::infrastructure::simulated_sensors::SimulatedSensors;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_bms, health_check, system_info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_bms_config()?;

    // Create measurement source (infrastructure layer)
    let source = Arc::new(SimulatedSensors::new(config.battery.num_cells));

    // Create the monitoring service (application layer); it owns the
    // estimator and publishes one snapshot per cycle
    let estimator = ChargeEstimator::new(
        config.battery.estimator_params(),
        OcvTable::lifepo4(),
        Instant::now(),
    );
    let (service, snapshot_rx) = MonitoringService::new(
        source,
        estimator,
        config.protection.thresholds(),
        config.balancing.policy(),
    );
    tokio::spawn(service.run(Duration::from_millis(config.sampling.interval_ms)));

    // Create application state
    let state = Arc::new(AppState {
        snapshot_rx,
        started: Instant::now(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/bms", get(get_bms))
        .route("/info", get(system_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.listen.parse()?;
    println!("Starting bms-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
