//! Posts random readings for a fixed set of devices to the ingest endpoint.
//!
//! Env: `API_URL` (default `http://localhost:8080/api/telemetry/ingest`),
//! `INTERVAL` (default `5s`; accepts `ms`, `s` or `m` suffixes).

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use telemetry_service::readings::NewReading;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct Device {
    id: &'static str,
    kind: &'static str,
    location: &'static str,
}

const DEVICES: [Device; 5] = [
    Device { id: "sensor-001", kind: "temperature", location: "building-a-floor-1" },
    Device { id: "sensor-002", kind: "humidity", location: "building-a-floor-2" },
    Device { id: "sensor-003", kind: "pressure", location: "building-b-floor-1" },
    Device { id: "sensor-004", kind: "multi-sensor", location: "building-b-floor-2" },
    Device { id: "sensor-005", kind: "temperature", location: "building-c-floor-1" },
];

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api_url = env_or("API_URL", "http://localhost:8080/api/telemetry/ingest");
    let interval_raw = env_or("INTERVAL", "5s");
    let interval = parse_interval(&interval_raw)
        .with_context(|| format!("invalid INTERVAL: {interval_raw:?}"))?;

    info!(api_url = %api_url, interval = %interval_raw, "Starting telemetry simulator");

    let client = reqwest::Client::new();
    // The first tick fires immediately.
    let mut ticker = time::interval(interval);
    loop {
        ticker.tick().await;
        send_reading(&client, &api_url).await;
    }
}

async fn send_reading(client: &reqwest::Client, api_url: &str) {
    let reading = random_reading();
    let device_id = reading.device_id.clone();

    match client.post(api_url).json(&reading).send().await {
        Ok(resp) if resp.status().is_success() => {
            info!(device_id = %device_id, "Sent telemetry reading");
        }
        Ok(resp) => {
            warn!(device_id = %device_id, status = %resp.status(), "Telemetry reading refused");
        }
        Err(e) => {
            warn!(device_id = %device_id, error = %e, "Failed to send telemetry reading");
        }
    }
}

fn random_reading() -> NewReading {
    let device = &DEVICES[fastrand::usize(..DEVICES.len())];
    NewReading {
        device_id: device.id.to_owned(),
        device_type: Some(device.kind.to_owned()),
        temperature: Some(between(15.0, 35.0)),
        humidity: Some(between(30.0, 80.0)),
        pressure: Some(between(980.0, 1020.0)),
        battery_level: Some(between(20.0, 100.0)),
        location: Some(device.location.to_owned()),
        timestamp: Some(Utc::now()),
        extra: Some(random_extra()),
    }
}

fn random_extra() -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("signal_strength".into(), json!(fastrand::u32(..100)));
    extra.insert("uptime_hours".into(), json!(fastrand::u32(..720)));
    extra.insert("error_count".into(), json!(fastrand::u32(..10)));
    extra.insert(
        "firmware_version".into(),
        json!(format!(
            "v{}.{}.{}",
            fastrand::u8(..3),
            fastrand::u8(..10),
            fastrand::u8(..10)
        )),
    );
    extra
}

fn between(low: f64, high: f64) -> f64 {
    low + fastrand::f64() * (high - low)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Parses `250ms`, `5s` or `2m`.
fn parse_interval(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len()));
    let n: u64 = digits.parse().context("expected a number followed by ms, s or m")?;
    let duration = match unit {
        "ms" => Duration::from_millis(n),
        "s" | "" => Duration::from_secs(n),
        "m" => Duration::from_secs(n.checked_mul(60).context("interval is too large")?),
        other => bail!("unknown interval unit {other:?}"),
    };
    if duration.is_zero() {
        bail!("interval must be greater than zero");
    }
    Ok(duration)
}
