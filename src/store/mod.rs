pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::readings::Reading;

pub use memory::MemoryReadingStore;
pub use postgres::PgReadingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected write: {0}")]
    WriteRejected(String),
}

/// Durable persistence for readings plus latest-per-device aggregation.
///
/// "Latest" means maximum `timestamp`; among equal timestamps the most
/// recently inserted reading wins. Implementations are shared across tasks.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Inserts a normalized reading and returns the id it was assigned.
    async fn create(&self, reading: &Reading) -> Result<Uuid, StoreError>;

    async fn latest_for(&self, device_id: &str) -> Result<Option<Reading>, StoreError>;

    /// One reading per distinct device, ordered by `device_id`.
    async fn latest_for_all(&self) -> Result<Vec<Reading>, StoreError>;
}

pub type SharedStore = Arc<dyn ReadingStore>;
