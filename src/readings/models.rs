use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ExtraValue;

/// A reading as supplied by a caller, before normalization. Serializes to the
/// ingest request body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
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
    pub timestamp: Option<DateTime<Utc>>,
    /// Parsed-JSON values, converted to [`ExtraValue`] during normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Map<String, Value>>,
}

impl NewReading {
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }
}

/// The canonical, normalized telemetry sample.
///
/// `id` is `None` until the store has persisted the reading; every reading
/// handed out by a store carries `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub device_id: String,
    #[serde(default)]
    pub device_type: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub extra: BTreeMap<String, ExtraValue>,
}

impl Reading {
    /// Copy of this reading carrying the id the store assigned.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// True when `ts` is a placeholder rather than a real capture time: the Unix
/// epoch or anything before it (e.g. `0001-01-01T00:00:00Z`).
pub fn is_unset_timestamp(ts: DateTime<Utc>) -> bool {
    ts.timestamp() <= 0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn new_reading_serializes_as_ingest_body() {
        let mut raw = NewReading::for_device("sensor-001");
        raw.battery_level = Some(85.0);
        let value = serde_json::to_value(&raw).unwrap();
        assert_eq!(value["deviceId"], "sensor-001");
        assert_eq!(value["batteryLevel"], 85.0);
        assert!(value.get("extra").is_none());

        raw.extra = Some(serde_json::Map::from_iter([("rssi".to_owned(), json!(-61))]));
        let value = serde_json::to_value(&raw).unwrap();
        assert_eq!(value["extra"]["rssi"], -61);
    }

    #[test]
    fn reading_serializes_camel_case_without_missing_id() {
        let reading = Reading {
            id: None,
            device_id: "d1".into(),
            device_type: String::new(),
            temperature: Some(21.0),
            humidity: None,
            pressure: None,
            battery_level: None,
            location: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            extra: BTreeMap::new(),
        };
        let value = serde_json::to_value(&reading).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["deviceId"], "d1");
        assert_eq!(value["batteryLevel"], Value::Null);

        let id = Uuid::new_v4();
        let value = serde_json::to_value(reading.with_id(id)).unwrap();
        assert_eq!(value["id"], id.to_string());
    }

    #[test]
    fn sentinel_timestamps_are_unset() {
        assert!(is_unset_timestamp(DateTime::<Utc>::MIN_UTC));
        assert!(is_unset_timestamp(
            Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
        ));
        assert!(is_unset_timestamp(Utc.timestamp_opt(0, 0).unwrap()));
        assert!(!is_unset_timestamp(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        ));
    }
}
