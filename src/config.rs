use std::str::FromStr;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// StoreBackend
// ---------------------------------------------------------------------------

/// Which `ReadingStore` implementation the service runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown store backend: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Destination topic for every published reading.
    pub topic: String,
    pub keepalive_secs: u64,
    /// Bound on requests queued for the event loop.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// `None` when `MQTT_HOST` is unset; readings are then only broadcast
    /// in-process.
    pub mqtt: Option<MqttConfig>,
    /// Capacity of the publish queue, shared by both publisher kinds.
    pub publish_queue_capacity: usize,
    /// Reported by the health endpoint.
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend: StoreBackend = optional("STORE_BACKEND", "postgres")
            .parse()
            .context("STORE_BACKEND must be 'postgres' or 'memory'")?;

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => non_empty("DATABASE_URL"),
        };

        let publish_queue_capacity = optional("PUBLISH_QUEUE_CAPACITY", "64")
            .parse()
            .context("PUBLISH_QUEUE_CAPACITY must be a positive integer")?;

        let mqtt = match non_empty("MQTT_HOST") {
            Some(host) => Some(MqttConfig {
                host,
                port: optional("MQTT_PORT", "1883")
                    .parse()
                    .context("MQTT_PORT must be a valid port number")?,
                client_id: optional("MQTT_CLIENT_ID", "telemetry-service"),
                username: non_empty("MQTT_USERNAME"),
                password: non_empty("MQTT_PASSWORD"),
                topic: optional("MQTT_TOPIC", "telemetry"),
                keepalive_secs: optional("MQTT_KEEPALIVE_SECS", "30")
                    .parse()
                    .context("MQTT_KEEPALIVE_SECS must be a positive integer")?,
                queue_capacity: publish_queue_capacity,
            }),
            None => None,
        };

        Ok(Self {
            store_backend,
            database_url,
            db_max_connections: optional("DB_MAX_CONNECTIONS", "10")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            mqtt,
            publish_queue_capacity,
            environment: optional("ENVIRONMENT", "production"),
        })
    }
}

fn required(key: &str) -> Result<String> {
    non_empty(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_owned())
}

/// The trimmed value of `key`, treating blank values as unset.
fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
