//! Test doubles for the store and publisher seams.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    publisher::{PublishError, Publisher},
    readings::Reading,
    store::{ReadingStore, StoreError},
};

/// Keeps every payload it is handed.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_readings(&self) -> Vec<Reading> {
        self.sent()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Simulates an unreachable broker; counts attempts.
#[derive(Clone, Default)]
pub struct FailingPublisher {
    attempts: Arc<AtomicUsize>,
}

impl FailingPublisher {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Publisher for FailingPublisher {
    fn publish(&self, _payload: Vec<u8>) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::Transport("connection refused".into()))
    }
}

#[derive(Clone, Copy)]
pub enum StoreFailure {
    Unavailable,
    WriteRejected,
}

/// A store whose every call fails the same way.
#[derive(Clone, Copy)]
pub struct FailingStore(pub StoreFailure);

impl FailingStore {
    fn error(&self) -> StoreError {
        match self.0 {
            StoreFailure::Unavailable => {
                StoreError::Unavailable("connection refused (10.0.0.5:5432)".into())
            }
            StoreFailure::WriteRejected => {
                StoreError::WriteRejected("document exceeds maximum size".into())
            }
        }
    }
}

#[async_trait]
impl ReadingStore for FailingStore {
    async fn create(&self, _reading: &Reading) -> Result<Uuid, StoreError> {
        Err(self.error())
    }

    async fn latest_for(&self, _device_id: &str) -> Result<Option<Reading>, StoreError> {
        Err(self.error())
    }

    async fn latest_for_all(&self) -> Result<Vec<Reading>, StoreError> {
        Err(self.error())
    }
}
