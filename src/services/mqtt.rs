//! Desktop MQTT client bridge.
//!
//! Adapts `rumqttc`'s async client to the sync [`MqttClient`] trait so the
//! same [`NodeRunner`](super::NodeRunner) drives desktop and ESP32 nodes.
//!
//! A tokio task polls the event loop: incoming publishes go into a bounded
//! channel drained by `try_recv`, `ConnAck` and errors flip the connected
//! flag. Publishes arriving while the channel is full are dropped.
//! `rumqttc` reconnects on the next poll after an error, so the task only
//! waits `reconnect_delay_ms` between attempts.
//!
//! ```ignore
//! let will = messages::last_will(identity, config.mqtt.last_will_topic.as_str());
//! let client = MqttBridge::connect(&config.mqtt, &config.mqtt.client_id(identity), &will);
//! let mut runner = NodeRunner::new(node, client, battery, &config);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::traits::{LastWill, MqttClient, MqttMessage, INBOX_CAPACITY};

/// Request queue depth of the rumqttc client.
const CAPACITY: usize = 32;

/// MQTT bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The request could not be queued.
    #[error("MQTT publish error: {0}")]
    Publish(String),
    /// The subscription could not be queued.
    #[error("MQTT subscribe error: {0}")]
    Subscribe(String),
}

/// `rumqttc` client exposed through [`MqttClient`].
pub struct MqttBridge {
    client: AsyncClient,
    incoming: mpsc::Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MqttBridge {
    /// Start the client. Must be called from within a tokio runtime.
    ///
    /// Returns immediately; the connection is made in the background.
    pub fn connect(config: &MqttConfig, client_id: &str, will: &LastWill) -> Self {
        let mut options = MqttOptions::new(client_id, config.host.as_str(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs as u64));
        options.set_last_will(rumqttc::LastWill::new(
            will.topic.as_str(),
            will.payload.clone(),
            QoS::AtLeastOnce,
            will.retain,
        ));
        if config.has_auth() {
            options.set_credentials(config.username.as_str(), config.password.as_str());
        }

        let (client, mut eventloop) = AsyncClient::new(options, CAPACITY);
        let (tx, incoming) = mpsc::channel(INBOX_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&connected);
        let retry = Duration::from_millis(config.reconnect_delay_ms as u64);
        let broker = format!("{}:{}", config.host, config.port);
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => {
                        if !handle_event(&event, &tx, &flag) {
                            break;
                        }
                    }
                    Err(e) => {
                        if flag.swap(false, Ordering::Relaxed) {
                            log::warn!("MQTT connection to {} lost: {}", broker, e);
                        } else {
                            log::debug!("MQTT connect to {} failed: {}", broker, e);
                        }
                        tokio::time::sleep(retry).await;
                    }
                }
            }
        });

        Self {
            client,
            incoming,
            connected,
            task,
        }
    }
}

impl Drop for MqttBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Apply one event loop event. Returns false once the receiver is gone.
fn handle_event(
    event: &Event,
    tx: &mpsc::Sender<MqttMessage>,
    connected: &AtomicBool,
) -> bool {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => {
            log::info!("MQTT connected");
            connected.store(true, Ordering::Relaxed);
            true
        }
        Event::Incoming(Packet::Disconnect) => {
            connected.store(false, Ordering::Relaxed);
            true
        }
        Event::Incoming(Packet::Publish(publish)) => {
            let msg = MqttMessage::new(publish.topic.clone(), publish.payload.to_vec());
            match tx.try_send(msg) {
                Ok(()) => true,
                Err(TrySendError::Full(msg)) => {
                    log::warn!("Inbox full, dropping message on {}", msg.topic);
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        }
        _ => true,
    }
}

impl MqttClient for MqttBridge {
    type Error = MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MqttError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| MqttError::Subscribe(e.to_string()))
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        self.incoming.try_recv().ok()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
