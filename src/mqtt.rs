//! MQTT publisher and broker connection driver.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;

/// Topic every telemetry frame is published to.
pub const TOPIC: &str = "victron/smartshunt";

const CLIENT_ID: &str = "mqtt-bridge-smartshunt";
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Bounds on the delay between reconnect attempts.
const RECONNECT_MIN: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(60);

/// Best-effort publisher for telemetry frames.
///
/// Cheap to clone; all clones share the underlying client, which is safe
/// to publish from while the driver task manages the connection.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Create the client and start the background event-loop driver.
    ///
    /// The driver owns reconnection: frames published while the broker is
    /// unreachable follow the publish retry policy, nothing is buffered.
    pub fn connect(config: &MqttConfig) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(CLIENT_ID, &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if !config.username.is_empty() {
            options.set_credentials(&config.username, &config.password);
        }

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let driver = tokio::spawn(drive_connection(eventloop));

        (Self { client }, driver)
    }

    /// Publish one frame payload, retrying once on failure.
    ///
    /// A second failure drops the frame with a warning; the pipeline
    /// continues with the next frame.
    pub async fn publish(&self, payload: Vec<u8>) {
        let first = self
            .client
            .publish(TOPIC, QoS::AtMostOnce, false, payload.clone())
            .await;

        if let Err(e) = first {
            warn!(topic = TOPIC, error = %e, "Publish failed, retrying once");
            if let Err(e) = self
                .client
                .publish(TOPIC, QoS::AtMostOnce, false, payload)
                .await
            {
                warn!(topic = TOPIC, error = %e, "Publish retry failed, dropping frame");
            }
        }
    }

    /// Best-effort disconnect; errors during teardown are swallowed.
    pub async fn shutdown(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "MQTT disconnect failed");
        }
    }
}

/// Drive the event loop forever.
///
/// rumqttc re-establishes the session on the next poll after a failure;
/// the delay between failed polls doubles from 1 s up to 60 s and resets
/// once traffic flows again.
async fn drive_connection(mut eventloop: EventLoop) {
    let mut delay = RECONNECT_MIN;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                delay = RECONNECT_MIN;
            }
            Ok(_) => {
                delay = RECONNECT_MIN;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_secs = delay.as_secs(),
                    "MQTT connection lost, reconnecting"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(RECONNECT_MAX);
            }
        }
    }
}
