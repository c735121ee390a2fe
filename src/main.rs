//! MQTT bridge daemon for the Victron SmartShunt.
//!
//! Runs until interrupted; configuration comes from the environment
//! (SERIAL_PORT, MQTT_HOST, MQTT_PORT, MQTT_USER, MQTT_PASSWORD,
//! LOG_LEVEL, LOG_FORMAT).

use anyhow::{Context, Result};
use tracing::{error, info};

use mqtt_bridge_smartshunt::bridge;
use mqtt_bridge_smartshunt::config::{Config, init_tracing};
use mqtt_bridge_smartshunt::mqtt::MqttPublisher;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        serial_port = %config.serial_port,
        broker_host = %config.mqtt.host,
        broker_port = config.mqtt.port,
        "Starting mqtt-bridge-smartshunt"
    );

    let (publisher, driver) = MqttPublisher::connect(&config.mqtt);

    let supervisor = tokio::spawn(bridge::run(config, publisher.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal");

    // Teardown is best-effort on every exit path: stop the pipeline first,
    // then let the driver flush the disconnect before it is stopped.
    supervisor.abort();
    publisher.shutdown().await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    driver.abort();

    info!("Bridge stopped");
    Ok(())
}
