//! Supervisor loop bridging the serial stream to MQTT.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::frame::{self, FrameAssembler, RawFrame};
use crate::mqtt::MqttPublisher;
use crate::serial::SerialLineSource;
use crate::telemetry;

/// Fixed spacing between serial open attempts. No backoff growth and no
/// retry ceiling: the device is expected to come back.
const REOPEN_DELAY: Duration = Duration::from_secs(3);

/// Run the bridge until the task is cancelled.
///
/// Serial-port loss closes the handle, discards any partially accumulated
/// frame, and reopens after a fixed delay. Cancellation is honored at the
/// next read-timeout boundary.
pub async fn run(config: Config, publisher: MqttPublisher) {
    loop {
        let mut source = match SerialLineSource::open(&config.serial_port) {
            Ok(source) => {
                info!(port = %config.serial_port, "Opened serial port");
                source
            }
            Err(e) => {
                error!(
                    port = %config.serial_port,
                    error = %e,
                    "Unable to open serial port, retrying in 3s"
                );
                tokio::time::sleep(REOPEN_DELAY).await;
                continue;
            }
        };

        // A partial frame never survives a reconnect.
        let mut assembler = FrameAssembler::new();

        loop {
            match source.next_line().await {
                Ok(Some(line)) => {
                    let Some((key, value)) = frame::split_line(&line) else {
                        continue;
                    };
                    if let Some(raw) = assembler.feed(key, value) {
                        publish_frame(&publisher, &raw).await;
                    }
                }
                Ok(None) => {
                    // Read timeout with no complete line; keep waiting.
                }
                Err(e) => {
                    error!(
                        error = %e,
                        discarded_registers = assembler.current().len(),
                        "Serial read error, reopening in 3s"
                    );
                    tokio::time::sleep(REOPEN_DELAY).await;
                    break;
                }
            }
        }
    }
}

/// Normalize a completed raw frame and hand it to the publisher.
async fn publish_frame(publisher: &MqttPublisher, raw: &RawFrame) {
    let telemetry = telemetry::normalize(raw);

    match telemetry.to_json() {
        Ok(payload) => {
            publisher.publish(payload).await;
            debug!(
                registers = raw.len(),
                fields = telemetry.len(),
                "Published frame"
            );
        }
        Err(e) => {
            warn!(error = %e, "Failed to encode frame");
        }
    }
}
