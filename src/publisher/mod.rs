pub mod broadcast;
pub mod mqtt;

use std::sync::Arc;

use thiserror::Error;

use crate::readings::Reading;

pub use broadcast::BroadcastPublisher;
pub use mqtt::MqttPublisher;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transport refused message: {0}")]
    Transport(String),
    #[error("no subscribers listening")]
    NoSubscribers,
}

/// Fire-and-forget handoff of a serialized reading to a message channel.
///
/// Implementations must not block on the remote end: `Ok` means the payload
/// was queued, not that anyone received it.
pub trait Publisher: Send + Sync {
    fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError>;
}

pub type SharedPublisher = Arc<dyn Publisher>;

/// Wire format of a published reading: the persisted reading as JSON.
pub fn encode(reading: &Reading) -> Result<Vec<u8>, PublishError> {
    Ok(serde_json::to_vec(reading)?)
}
