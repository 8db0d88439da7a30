use tokio::sync::broadcast;

use super::{PublishError, Publisher};

/// In-process fan-out of published readings.
///
/// Used when no broker is configured. Lagging receivers lose the oldest
/// messages once `capacity` is exceeded.
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<Vec<u8>>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        self.sender
            .send(payload)
            .map(|_| ())
            .map_err(|_| PublishError::NoSubscribers)
    }
}
