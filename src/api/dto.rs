use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    ingest::IngestStats,
    readings::{ExtraValue, NewReading, Reading},
};

/// Request body for `POST /api/telemetry/ingest`.
///
/// Every field except `deviceId` may be omitted. A missing `deviceId`
/// deserializes to the empty string so the pipeline rejects it with a
/// validation error instead of a framework-level parse failure.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub device_id: String,
    pub device_type: Option<String>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// Percent
    pub battery_level: Option<f64>,
    pub location: Option<String>,
    /// Capture time (RFC3339). Defaults to the time of ingestion.
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-form scalars or nested objects. `additionalData` is accepted too.
    #[serde(default, alias = "additionalData")]
    #[schema(value_type = Object)]
    pub extra: Option<serde_json::Map<String, Value>>,
}

impl From<IngestRequest> for NewReading {
    fn from(r: IngestRequest) -> Self {
        Self {
            device_id: r.device_id,
            device_type: r.device_type,
            temperature: r.temperature,
            humidity: r.humidity,
            pressure: r.pressure,
            battery_level: r.battery_level,
            location: r.location,
            timestamp: r.timestamp,
            extra: r.extra,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub id: Option<Uuid>,
    pub device_id: String,
    pub device_type: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub extra: BTreeMap<String, ExtraValue>,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            device_type: r.device_type,
            temperature: r.temperature,
            humidity: r.humidity,
            pressure: r.pressure,
            battery_level: r.battery_level,
            location: r.location,
            timestamp: r.timestamp,
            extra: r.extra,
        }
    }
}

/// Body of `GET /api/telemetry/latest`: one reading when `deviceId` is given,
/// otherwise one reading per device.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum LatestDto {
    One(ReadingDto),
    All(Vec<ReadingDto>),
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub ingest: IngestStatsDto,
}

/// Ingestion counters since process start.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestStatsDto {
    pub ingested: u64,
    pub rejected: u64,
    pub store_failures: u64,
    pub published: u64,
    pub publish_failures: u64,
}

impl From<&IngestStats> for IngestStatsDto {
    fn from(stats: &IngestStats) -> Self {
        Self {
            ingested: IngestStats::get(&stats.ingested),
            rejected: IngestStats::get(&stats.rejected),
            store_failures: IngestStats::get(&stats.store_failures),
            published: IngestStats::get(&stats.published),
            publish_failures: IngestStats::get(&stats.publish_failures),
        }
    }
}
