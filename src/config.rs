//! Bridge configuration, sourced from the process environment at startup.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

/// Immutable bridge configuration, built once and passed into the
/// components that need it. No component reads the environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// Serial device path the SmartShunt is attached to.
    pub serial_port: String,

    /// MQTT broker settings.
    pub mqtt: MqttConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// MQTT broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,

    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_mqtt_host() -> String {
    "core-mosquitto".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_user() -> String {
    "homeassistant".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mqtt_port = match lookup("MQTT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid("MQTT_PORT", e.to_string()))?,
            None => default_mqtt_port(),
        };

        let format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => LogFormat::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid(
                        "LOG_FORMAT",
                        format!("unknown format '{other}' (use text or json)"),
                    ));
                }
            },
        };

        Ok(Self {
            serial_port: lookup("SERIAL_PORT").unwrap_or_else(default_serial_port),
            mqtt: MqttConfig {
                host: lookup("MQTT_HOST").unwrap_or_else(default_mqtt_host),
                port: mqtt_port,
                username: lookup("MQTT_USER").unwrap_or_else(default_mqtt_user),
                password: lookup("MQTT_PASSWORD").unwrap_or_default(),
            },
            logging: LoggingConfig {
                level: lookup("LOG_LEVEL").unwrap_or_else(default_log_level),
                format,
            },
        })
    }
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Tracing(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Tracing(e.to_string()))?;
        }
    }

    Ok(())
}
