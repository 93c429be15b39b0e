//! MQTT client for ESP32-C3.
//!
//! Wraps `esp-idf-svc`'s client, which reconnects on its own. Broker events
//! are drained on a background thread: received messages go into a bounded
//! channel polled by [`MqttClient::try_recv`] (dropped when it is full), and
//! connect/disconnect events update
//! a shared flag so the runner can re-subscribe after a reconnect.
//!
//! The last will is registered at connect time.
//!
//! # Example
//!
//! ```ignore
//! use rs_loconode::hal::esp32::Esp32Mqtt;
//! use rs_loconode::config::MqttConfig;
//! use rs_loconode::messages;
//!
//! let config = MqttConfig::default().with_host("192.168.1.100");
//! let will = messages::last_will(identity, config.last_will_topic.as_str());
//! let mqtt = Esp32Mqtt::new(&config, &config.client_id(identity), &will)?;
//! ```

use crate::config::MqttConfig;
use crate::traits::{LastWill, MqttClient, MqttMessage, INBOX_CAPACITY};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration,
    QoS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Error type for ESP32 MQTT operations.
#[derive(Debug, thiserror::Error)]
#[error("MQTT error: {0}")]
pub struct Esp32MqttError(pub String);

/// MQTT client for the node.
pub struct Esp32Mqtt {
    client: EspMqttClient<'static>,
    message_rx: Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Create the client and start connecting in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: &MqttConfig, client_id: &str, will: &LastWill) -> anyhow::Result<Self> {
        let broker_url = format!("mqtt://{}:{}", config.host.as_str(), config.port);

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(Duration::from_secs(config.keep_alive_secs as u64)),
            reconnect_timeout: Some(Duration::from_millis(config.reconnect_delay_ms as u64)),
            username: config.has_auth().then(|| config.username.as_str()),
            password: config.has_auth().then(|| config.password.as_str()),
            lwt: Some(LwtConfiguration {
                topic: will.topic.as_str(),
                payload: &will.payload,
                qos: QoS::AtLeastOnce,
                retain: will.retain,
            }),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&broker_url, &mqtt_config)?;

        let (message_tx, message_rx) = sync_channel::<MqttMessage>(INBOX_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || handle_mqtt_events(&mut connection, message_tx, flag))?;

        log::info!("MQTT client {} connecting to {}", client_id, broker_url);

        Ok(Self {
            client,
            message_rx,
            connected,
        })
    }
}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        self.client
            .publish(topic, qos, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        match self.message_rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connected.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

fn handle_mqtt_events(
    connection: &mut EspMqttConnection,
    message_tx: SyncSender<MqttMessage>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match connection.next() {
            Err(e) => {
                log::warn!("MQTT connection closed: {:?}", e);
                connected.store(false, Ordering::Relaxed);
                return;
            }
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    log::info!("MQTT connected");
                    connected.store(true, Ordering::Relaxed);
                }
                EventPayload::Disconnected => {
                    log::warn!("MQTT disconnected");
                    connected.store(false, Ordering::Relaxed);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => match message_tx.try_send(MqttMessage::new(topic, data.to_vec())) {
                    Ok(()) => {}
                    Err(TrySendError::Full(msg)) => {
                        log::warn!("Inbox full, dropping message on {}", msg.topic)
                    }
                    Err(TrySendError::Disconnected(_)) => return,
                },
                _ => {}
            },
        }
    }
}
