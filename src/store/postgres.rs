use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{ReadingStore, StoreError};
use crate::{db::models::ReadingRow, readings::Reading};

const SELECT_COLUMNS: &str = "id, device_id, device_type, temperature, humidity, \
     pressure, battery_level, location, recorded_at, extra";

/// `ReadingStore` backed by the `telemetry_readings` table.
///
/// Each reading is one row; `extra` is kept as a JSONB document. The pool is
/// shared, so clones are cheap and safe to hand to every request.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn create(&self, reading: &Reading) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO telemetry_readings
                (device_id, device_type, temperature, humidity,
                 pressure, battery_level, location, recorded_at, extra)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&reading.device_id)
        .bind(&reading.device_type)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.pressure)
        .bind(reading.battery_level)
        .bind(&reading.location)
        .bind(reading.timestamp)
        .bind(Json(&reading.extra))
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        debug!(device_id = %reading.device_id, id = %id, "Reading row inserted");
        Ok(id)
    }

    async fn latest_for(&self, device_id: &str) -> Result<Option<Reading>, StoreError> {
        let row = sqlx::query_as::<_, ReadingRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM telemetry_readings
            WHERE device_id = $1
            ORDER BY recorded_at DESC, seq DESC
            LIMIT 1
            "#
        ))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(row.map(Into::into))
    }

    async fn latest_for_all(&self) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            r#"
            SELECT DISTINCT ON (device_id) {SELECT_COLUMNS}
            FROM telemetry_readings
            ORDER BY device_id, recorded_at DESC, seq DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Constraint violations and encoding failures mean the document itself was
/// refused; everything else is treated as the database being unreachable.
fn write_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => StoreError::WriteRejected(db.message().to_owned()),
        sqlx::Error::Encode(e) => StoreError::WriteRejected(e.to_string()),
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn read_error(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use sqlx::PgPool;

    use super::*;
    use crate::{
        ingest::IngestService,
        readings::{ExtraValue, NewReading},
        testing::RecordingPublisher,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn make_reading(device_id: &str, temperature: f64, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            id: None,
            device_id: device_id.to_owned(),
            device_type: "multi-sensor".into(),
            temperature: Some(temperature),
            humidity: Some(55.0),
            pressure: None,
            battery_level: Some(90.0),
            location: "building-a-floor-1".into(),
            timestamp,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn database_errors_on_write_are_rejections() {
        let err = write_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = write_error(sqlx::Error::Encode("bad document".into()));
        assert!(matches!(err, StoreError::WriteRejected(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn create_then_latest_round_trips_every_field(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        let mut reading = make_reading("dev1", 25.5, t0());
        reading.extra.insert("signal_strength".into(), ExtraValue::Integer(87));
        reading.extra.insert("ratio".into(), ExtraValue::Float(0.5));
        reading.extra.insert("ok".into(), ExtraValue::Bool(true));

        let id = store.create(&reading).await.unwrap();
        let got = store.latest_for("dev1").await.unwrap().unwrap();

        assert_eq!(got, reading.with_id(id));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn ingested_reading_matches_stored_row_at_nanosecond_input(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        let publisher = RecordingPublisher::default();
        let service = IngestService::new(
            std::sync::Arc::new(store.clone()),
            std::sync::Arc::new(publisher.clone()),
        );

        let precise = Utc.timestamp_opt(1_714_564_800, 123_456_789).unwrap();
        let supplied = service
            .ingest(NewReading {
                timestamp: Some(precise),
                ..NewReading::for_device("dev1")
            })
            .await
            .unwrap();
        assert_eq!(store.latest_for("dev1").await.unwrap().unwrap(), supplied.reading);

        let stamped = service.ingest(NewReading::for_device("dev2")).await.unwrap();
        assert_eq!(store.latest_for("dev2").await.unwrap().unwrap(), stamped.reading);

        assert_eq!(publisher.sent_readings(), vec![supplied.reading, stamped.reading]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn latest_for_unknown_device_is_none(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        assert!(store.latest_for("unknown").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn equal_timestamps_prefer_latest_insert(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        store.create(&make_reading("dev1", 1.0, t0())).await.unwrap();
        let second = store.create(&make_reading("dev1", 2.0, t0())).await.unwrap();

        let got = store.latest_for("dev1").await.unwrap().unwrap();
        assert_eq!(got.id, Some(second));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn latest_for_all_returns_one_row_per_device(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        store.create(&make_reading("dev1", 20.0, t0())).await.unwrap();
        store
            .create(&make_reading("dev1", 26.0, t0() + Duration::seconds(5)))
            .await
            .unwrap();
        store.create(&make_reading("dev2", 30.0, t0())).await.unwrap();

        let all = store.latest_for_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let dev1 = all.iter().find(|r| r.device_id == "dev1").unwrap();
        assert_eq!(dev1.temperature, Some(26.0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn empty_device_id_is_rejected_by_schema(pool: PgPool) {
        let store = PgReadingStore::new(pool);
        let err = store.create(&make_reading("", 20.0, t0())).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected(_)));
    }
}
