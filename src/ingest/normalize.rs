use chrono::{DateTime, SubsecRound, Utc};

use super::IngestError;
use crate::readings::{extra::convert_map, models::is_unset_timestamp, NewReading, Reading};

/// Turns a caller-supplied reading into one ready for persistence.
///
/// - rejects an empty or blank `device_id`
/// - replaces a missing or sentinel `timestamp` with `now`
/// - truncates the timestamp to microseconds, the precision `TIMESTAMPTZ` keeps
/// - converts `extra` from parsed JSON to native values
///
/// Nothing else is touched; measurements pass through as given.
pub fn normalize(raw: NewReading, now: DateTime<Utc>) -> Result<Reading, IngestError> {
    if raw.device_id.trim().is_empty() {
        return Err(IngestError::Validation("deviceId is required".into()));
    }

    let timestamp = match raw.timestamp {
        Some(ts) if !is_unset_timestamp(ts) => ts,
        _ => now,
    }
    .trunc_subsecs(6);

    Ok(Reading {
        id: None,
        device_id: raw.device_id,
        device_type: raw.device_type.unwrap_or_default(),
        temperature: raw.temperature,
        humidity: raw.humidity,
        pressure: raw.pressure,
        battery_level: raw.battery_level,
        location: raw.location.unwrap_or_default(),
        timestamp,
        extra: raw.extra.map(convert_map).unwrap_or_default(),
    })
}
