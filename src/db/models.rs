use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::readings::{ExtraValue, Reading};

/// One row of `telemetry_readings`. The `seq` insertion counter only takes
/// part in ordering and is not selected.
#[derive(Debug, Clone, FromRow)]
pub struct ReadingRow {
    pub id: Uuid,
    pub device_id: String,
    pub device_type: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    pub location: String,
    pub recorded_at: DateTime<Utc>,
    pub extra: Json<BTreeMap<String, ExtraValue>>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            id: Some(row.id),
            device_id: row.device_id,
            device_type: row.device_type,
            temperature: row.temperature,
            humidity: row.humidity,
            pressure: row.pressure,
            battery_level: row.battery_level,
            location: row.location,
            timestamp: row.recorded_at,
            extra: row.extra.0,
        }
    }
}
