//! MQTT bridge for Victron SmartShunt VE.Direct telemetry.
//!
//! Reads tab-separated register lines from the SmartShunt serial port,
//! assembles them into frames on the `H18` boundary register, scales the
//! raw values into physical units, and publishes each frame as a JSON
//! object to `victron/smartshunt`.

pub mod bridge;
pub mod config;
pub mod frame;
pub mod mqtt;
pub mod serial;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use config::{Config, ConfigError, LogFormat, LoggingConfig, init_tracing};
pub use frame::{FrameAssembler, RawFrame, split_line};
pub use mqtt::MqttPublisher;
pub use serial::{SerialError, SerialLineSource};
pub use telemetry::{TelemetryFrame, Value, coerce, normalize};
