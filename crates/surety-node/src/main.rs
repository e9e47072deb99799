//! FlightSurety Node
//!
//! Hosts the insurance engine on a single-writer service, seeds the first
//! airline, writes the deployment manifest and runs simulated oracles.

mod config;
mod simulator;

use anyhow::Result;
use surety_app::{CallContext, DeploymentManifest, FlightSuretyApp, SuretyService};
use surety_common::VERSION;
use surety_ledger::SharedRail;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::NodeConfig;
use crate::simulator::OracleSimulator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FlightSurety node v{}", VERSION);

    let config = NodeConfig::load()?;
    info!(
        url = %config.network_url,
        oracles = config.simulated_oracles,
        "Loaded configuration"
    );

    let admin = config.admin_account()?;
    let data_id = config.data_account()?;
    let app_id = config.app_account()?;
    let first_airline = config.first_airline_account()?;

    // Deploy
    let rail = SharedRail::new();
    let app = FlightSuretyApp::new(
        app_id,
        data_id,
        admin,
        config.app_config(),
        Box::new(rail),
    )?;
    let handle = SuretyService::spawn(app);

    // Log every committed event
    let mut events = handle.event_stream();
    tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(envelope) => match serde_json::to_string(&envelope.event) {
                    Ok(json) => info!(height = envelope.height, "{}", json),
                    Err(err) => warn!(error = %err, "Unencodable event"),
                },
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "Event log lagged");
                }
            }
        }
    });

    handle
        .bootstrap_airline(
            CallContext::new(admin),
            first_airline,
            config.first_airline_name.clone(),
        )
        .await?;
    info!(airline = %first_airline, name = %config.first_airline_name, "First airline registered");

    DeploymentManifest::new(config.network_url.clone(), data_id, app_id)
        .write_to(&config.manifest_path)?;

    if config.simulated_oracles > 0 {
        let simulator = OracleSimulator::register(
            handle.clone(),
            config.simulated_oracles,
            config.oracle.registration_fee,
            config.simulated_status(),
        )
        .await?;
        simulator.spawn();
    }

    info!(app = %app_id, data = %data_id, "FlightSurety node started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    Ok(())
}
