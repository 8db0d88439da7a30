use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ReadingStore, StoreError};
use crate::readings::Reading;

#[derive(Default)]
struct Inner {
    /// Append-only, in insertion order.
    readings: Vec<Reading>,
    /// device_id → index into `readings` of that device's latest reading.
    latest: HashMap<String, usize>,
}

/// Process-local `ReadingStore`.
///
/// Keeps every reading plus a per-device index of the current latest one, so
/// both queries are lookups rather than scans. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of readings stored, across all devices.
    pub async fn len(&self) -> usize {
        self.inner.read().await.readings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn create(&self, reading: &Reading) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;

        let index = inner.readings.len();
        inner.readings.push(reading.clone().with_id(id));

        // `>=` so that a later insert wins a timestamp tie.
        let replaces = match inner.latest.get(&reading.device_id) {
            Some(&current) => reading.timestamp >= inner.readings[current].timestamp,
            None => true,
        };
        if replaces {
            inner.latest.insert(reading.device_id.clone(), index);
        }

        Ok(id)
    }

    async fn latest_for(&self, device_id: &str) -> Result<Option<Reading>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .latest
            .get(device_id)
            .map(|&index| inner.readings[index].clone()))
    }

    async fn latest_for_all(&self) -> Result<Vec<Reading>, StoreError> {
        let inner = self.inner.read().await;
        let mut latest: Vec<Reading> = inner
            .latest
            .values()
            .map(|&index| inner.readings[index].clone())
            .collect();
        latest.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(latest)
    }
}
