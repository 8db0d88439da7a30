use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::normalize::normalize;
use crate::{
    publisher::{self, SharedPublisher},
    readings::{NewReading, Reading},
    store::{SharedStore, StoreError},
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid reading: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: Uuid,
    /// The reading as persisted, id included.
    pub reading: Reading,
    /// Whether the publisher accepted the copy. Informational only.
    pub published: bool,
}

/// Counters for the ingestion path.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub ingested: AtomicU64,
    pub rejected: AtomicU64,
    pub store_failures: AtomicU64,
    pub published: AtomicU64,
    pub publish_failures: AtomicU64,
}

impl IngestStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Normalize → persist → publish.
///
/// Only a validation or store failure fails the call. Publishing happens
/// strictly after the store confirmed the write, and its outcome never
/// changes the result returned to the caller.
#[derive(Clone)]
pub struct IngestService {
    store: SharedStore,
    publisher: SharedPublisher,
    stats: Arc<IngestStats>,
}

impl IngestService {
    pub fn new(store: SharedStore, publisher: SharedPublisher) -> Self {
        Self {
            store,
            publisher,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    pub async fn ingest(&self, raw: NewReading) -> Result<IngestOutcome, IngestError> {
        let reading = match normalize(raw, Utc::now()) {
            Ok(reading) => reading,
            Err(err) => {
                IngestStats::bump(&self.stats.rejected);
                warn!(error = %err, "Rejected telemetry reading");
                return Err(err);
            }
        };

        let id = match self.store.create(&reading).await {
            Ok(id) => id,
            Err(err) => {
                IngestStats::bump(&self.stats.store_failures);
                error!(device_id = %reading.device_id, error = %err, "Failed to persist telemetry reading");
                return Err(err.into());
            }
        };
        IngestStats::bump(&self.stats.ingested);

        let reading = reading.with_id(id);
        let published = self.publish(&reading);

        info!(
            device_id = %reading.device_id,
            id = %id,
            published,
            "Telemetry data ingested"
        );
        Ok(IngestOutcome { id, reading, published })
    }

    fn publish(&self, reading: &Reading) -> bool {
        match publisher::encode(reading).and_then(|payload| self.publisher.publish(payload)) {
            Ok(()) => {
                IngestStats::bump(&self.stats.published);
                true
            }
            Err(err) => {
                IngestStats::bump(&self.stats.publish_failures);
                warn!(device_id = %reading.device_id, error = %err, "Failed to publish telemetry reading");
                false
            }
        }
    }
}
