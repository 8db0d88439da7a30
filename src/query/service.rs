use tracing::debug;

use crate::{
    readings::Reading,
    store::{SharedStore, StoreError},
};

/// Answer to a latest-reading query.
#[derive(Debug, Clone, PartialEq)]
pub enum Latest {
    One(Reading),
    /// One reading per device; empty when nothing has been ingested.
    All(Vec<Reading>),
    NotFound,
}

/// Read-only view over the store's latest-per-device aggregation.
#[derive(Clone)]
pub struct LatestQueryService {
    store: SharedStore,
}

impl LatestQueryService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// With a non-blank `device_id`, that device's latest reading or
    /// `NotFound`; otherwise the latest reading of every device.
    pub async fn get_latest(&self, device_id: Option<&str>) -> Result<Latest, StoreError> {
        match device_id.filter(|id| !id.trim().is_empty()) {
            Some(device_id) => {
                let latest = self.store.latest_for(device_id).await?;
                debug!(device_id = %device_id, found = latest.is_some(), "Latest reading lookup");
                Ok(latest.map_or(Latest::NotFound, Latest::One))
            }
            None => {
                let all = self.store.latest_for_all().await?;
                debug!(devices = all.len(), "Latest reading per device");
                Ok(Latest::All(all))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        ingest::IngestService,
        readings::NewReading,
        store::MemoryReadingStore,
        testing::{FailingStore, RecordingPublisher, StoreFailure},
    };

    fn services() -> (IngestService, LatestQueryService) {
        let store: SharedStore = Arc::new(MemoryReadingStore::new());
        let ingest = IngestService::new(store.clone(), Arc::new(RecordingPublisher::default()));
        (ingest, LatestQueryService::new(store))
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let (_, query) = services();
        assert_eq!(
            query.get_latest(Some("unknown-device")).await.unwrap(),
            Latest::NotFound
        );
    }

    #[tokio::test]
    async fn no_device_on_empty_store_is_empty_list() {
        let (_, query) = services();
        assert_eq!(query.get_latest(None).await.unwrap(), Latest::All(vec![]));
    }

    #[tokio::test]
    async fn blank_device_id_means_all_devices() {
        let (ingest, query) = services();
        ingest.ingest(NewReading::for_device("d1")).await.unwrap();

        let Latest::All(all) = query.get_latest(Some("  ")).await.unwrap() else {
            panic!("expected all-devices answer");
        };
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn round_trip_returns_the_ingested_reading() {
        let (ingest, query) = services();
        let mut raw = NewReading::for_device("test-device-001");
        raw.device_type = Some("temperature".into());
        raw.temperature = Some(25.5);
        raw.humidity = Some(60.0);
        raw.pressure = Some(1013.25);
        raw.battery_level = Some(85.0);
        raw.location = Some("test-location".into());

        let outcome = ingest.ingest(raw).await.unwrap();

        assert_eq!(
            query.get_latest(Some("test-device-001")).await.unwrap(),
            Latest::One(outcome.reading)
        );
    }

    #[tokio::test]
    async fn padded_device_id_is_looked_up_as_stored() {
        let (ingest, query) = services();
        let outcome = ingest.ingest(NewReading::for_device(" d1")).await.unwrap();

        assert_eq!(
            query.get_latest(Some(" d1")).await.unwrap(),
            Latest::One(outcome.reading)
        );
        assert_eq!(query.get_latest(Some("d1")).await.unwrap(), Latest::NotFound);
    }

    #[tokio::test]
    async fn latest_follows_maximum_timestamp() {
        let (ingest, query) = services();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for (temperature, ts) in [(25.5, t1), (26.0, t1 + Duration::seconds(1))] {
            ingest
                .ingest(NewReading {
                    temperature: Some(temperature),
                    timestamp: Some(ts),
                    ..NewReading::for_device("d1")
                })
                .await
                .unwrap();
        }

        let Latest::One(latest) = query.get_latest(Some("d1")).await.unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(latest.temperature, Some(26.0));
    }

    #[tokio::test]
    async fn all_devices_returns_one_per_device() {
        let (ingest, query) = services();
        ingest.ingest(NewReading::for_device("d1")).await.unwrap();
        ingest.ingest(NewReading::for_device("d2")).await.unwrap();
        ingest.ingest(NewReading::for_device("d1")).await.unwrap();

        let Latest::All(all) = query.get_latest(None).await.unwrap() else {
            panic!("expected all-devices answer");
        };
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.device_id == "d1"));
        assert!(all.iter().any(|r| r.device_id == "d2"));
    }

    #[tokio::test]
    async fn repeated_queries_are_identical() {
        let (ingest, query) = services();
        ingest.ingest(NewReading::for_device("d1")).await.unwrap();
        ingest.ingest(NewReading::for_device("d2")).await.unwrap();

        assert_eq!(
            query.get_latest(None).await.unwrap(),
            query.get_latest(None).await.unwrap()
        );
        assert_eq!(
            query.get_latest(Some("d1")).await.unwrap(),
            query.get_latest(Some("d1")).await.unwrap()
        );
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let query = LatestQueryService::new(Arc::new(FailingStore(StoreFailure::Unavailable)));
        assert!(matches!(
            query.get_latest(Some("d1")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(query.get_latest(None).await.is_err());
    }
}
