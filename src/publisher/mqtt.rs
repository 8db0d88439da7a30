use std::time::Duration;

use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, Outgoing, QoS};
use tokio::{
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::{info, warn};

use super::{PublishError, Publisher};
use crate::config::MqttConfig;

/// Publishes readings to an MQTT topic.
///
/// `publish` only enqueues onto the client's bounded request channel; a
/// background task owns the event loop, performs the network I/O and
/// reconnects after failures. While the broker is down the channel fills up
/// and further publishes fail fast instead of waiting.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
}

impl MqttPublisher {
    /// Builds the client and spawns its event loop. Must be called from
    /// within a Tokio runtime.
    pub fn connect(config: &MqttConfig) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.host.clone(),
            config.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs));
        if let Some(username) = &config.username {
            options.set_credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        let (client, mut eventloop) = AsyncClient::new(options, config.queue_capacity.max(1));
        let broker = format!("{}:{}", config.host, config.port);

        let handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!(broker = %broker, "MQTT publisher connected");
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        info!(broker = %broker, "MQTT publisher disconnected");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(broker = %broker, error = %err, "MQTT event loop error; reconnecting");
                        sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });

        (Self::from_client(client, config.topic.clone()), handle)
    }

    fn from_client(client: AsyncClient, topic: String) -> Self {
        Self { client, topic }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Queues DISCONNECT and waits up to `grace` for the event loop to send
    /// it and exit; the loop is aborted after that. Never blocks on a full
    /// request queue.
    pub async fn shutdown(&self, eventloop: JoinHandle<()>, grace: Duration) {
        if let Err(err) = self.client.try_disconnect() {
            warn!(error = %err, "MQTT disconnect could not be queued");
        }

        let abort = eventloop.abort_handle();
        if timeout(grace, eventloop).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "MQTT event loop did not stop in time; aborting");
            abort.abort();
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        self.client
            .try_publish(self.topic.clone(), QoS::AtLeastOnce, false, payload)
            .map_err(|err| PublishError::Transport(err.to_string()))
    }
}
