//! Cooperative node runner for unified polling across platforms.
//!
//! Provides a platform-agnostic loop body that works with any
//! implementation of the `MqttClient` trait. Each [`NodeRunner::step`]:
//!
//! 1. takes at most one message from the command topic and runs it to
//!    completion,
//! 2. ticks the node (motion, power, function outputs),
//! 3. publishes battery telemetry and pings when due.
//!
//! While the broker is unreachable, steps 1 and 3 are skipped but the node
//! keeps ticking, so an active override or a ramp in progress is unaffected.
//!
//! # Example
//!
//! ```ignore
//! use rs_loconode::services::NodeRunner;
//!
//! let mut runner = NodeRunner::new(node, mqtt_client, battery, &config);
//!
//! // In main loop:
//! runner.step(clock.now_ms())?;
//! ```

use crate::commands::MessageOutcome;
use crate::config::{BatteryConfig, Config, MqttConfig};
use crate::messages::{ping, BatteryReport};
use crate::node::LocoNode;
use crate::traits::{ActuationDriver, BatterySensor, MqttClient};

// ============================================================================
// Node Runner
// ============================================================================

/// Owns a node together with its MQTT client and battery sensor.
pub struct NodeRunner<D, C, B>
where
    D: ActuationDriver,
    C: MqttClient,
    B: BatterySensor,
{
    node: LocoNode<D>,
    client: C,
    battery: B,
    mqtt: MqttConfig,
    battery_config: BatteryConfig,
    subscribed: bool,
    last_telemetry_ms: Option<u64>,
    last_ping_ms: Option<u64>,
}

impl<D, C, B> NodeRunner<D, C, B>
where
    D: ActuationDriver,
    C: MqttClient,
    C::Error: core::fmt::Debug,
    B: BatterySensor,
    B::Error: core::fmt::Debug,
{
    /// Create a runner using the MQTT and battery sections of `config`.
    pub fn new(node: LocoNode<D>, client: C, battery: B, config: &Config) -> Self {
        Self {
            node,
            client,
            battery,
            mqtt: config.mqtt.clone(),
            battery_config: config.battery,
            subscribed: false,
            last_telemetry_ms: None,
            last_ping_ms: None,
        }
    }

    /// The node.
    pub fn node(&self) -> &LocoNode<D> {
        &self.node
    }

    /// Mutable access to the node.
    pub fn node_mut(&mut self) -> &mut LocoNode<D> {
        &mut self.node
    }

    /// Get a reference to the MQTT client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get a mutable reference to the MQTT client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// True once subscribed to the command topic on the current session.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Run one loop iteration.
    ///
    /// Returns the outcome of the message handled in this step, if any.
    /// Only actuation failures are errors; network trouble is logged.
    pub fn step(&mut self, now_ms: u64) -> Result<Option<MessageOutcome>, D::Error> {
        let online = self.ensure_subscribed();

        let outcome = if online { self.poll_message() } else { None };

        self.node.tick(now_ms)?;

        if online {
            self.housekeeping(now_ms);
        }
        Ok(outcome)
    }

    /// Track the session and (re)subscribe after every connect.
    fn ensure_subscribed(&mut self) -> bool {
        if !self.client.is_connected() {
            if self.subscribed {
                log::warn!("Broker connection lost");
            }
            self.subscribed = false;
            return false;
        }
        if !self.subscribed {
            let topic = self.mqtt.command_topic.as_str();
            match self.client.subscribe(topic) {
                Ok(()) => {
                    log::info!("Subscribed to {}", topic);
                    self.subscribed = true;
                }
                Err(e) => log::warn!("Subscribe to {} failed: {:?}", topic, e),
            }
        }
        self.subscribed
    }

    fn poll_message(&mut self) -> Option<MessageOutcome> {
        let msg = self.client.try_recv()?;
        if msg.topic != self.mqtt.command_topic.as_str() {
            log::debug!("Ignoring message on {}", msg.topic);
            return None;
        }
        Some(self.node.handle_message(&msg.payload))
    }

    fn housekeeping(&mut self, now_ms: u64) {
        if due(self.last_telemetry_ms, self.mqtt.telemetry_interval_ms, now_ms) {
            self.last_telemetry_ms = Some(now_ms);
            self.publish_telemetry();
        }
        if due(self.last_ping_ms, self.mqtt.ping_interval_ms, now_ms) {
            self.last_ping_ms = Some(now_ms);
            let payload = ping(self.node.identity());
            self.publish(PublishKind::Ping, payload.as_bytes());
        }
    }

    fn publish_telemetry(&mut self) {
        match self.battery.read_raw() {
            Ok(raw) => {
                let report = BatteryReport::new(self.node.identity(), raw, &self.battery_config);
                self.publish(PublishKind::Telemetry, report.to_payload().as_bytes());
            }
            Err(e) => log::warn!("Battery read failed: {:?}", e),
        }
    }

    fn publish(&mut self, kind: PublishKind, payload: &[u8]) {
        let topic = match kind {
            PublishKind::Telemetry => self.mqtt.telemetry_topic.as_str(),
            PublishKind::Ping => self.mqtt.ping_topic.as_str(),
        };
        if let Err(e) = self.client.publish(topic, payload, false) {
            log::warn!("Publish to {} failed: {:?}", topic, e);
        }
    }
}

#[derive(Clone, Copy)]
enum PublishKind {
    Telemetry,
    Ping,
}

fn due(last: Option<u64>, interval_ms: u32, now_ms: u64) -> bool {
    match last {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= u64::from(interval_ms),
    }
}
