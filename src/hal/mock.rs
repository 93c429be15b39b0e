//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without physical hardware.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockDriver`] | [`ActuationDriver`] | Records power levels and output states |
//! | [`MockIrTransmitter`] | [`IrTransmitter`] | Records Power Functions frames |
//! | [`MockBattery`] | [`BatterySensor`] | Fixed raw reading |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockIdentityStore`] | [`IdentityStore`] | In-memory identity storage |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//! | [`MockLink`] | [`Link`] | Scriptable link state |
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::{Identity, LocoNode};
//! use rs_loconode::hal::MockDriver;
//!
//! let mut node = LocoNode::new(Identity::new(42).unwrap(), MockDriver::new());
//! node.handle_message(br#"<fn id="t1" addr="42" fnchanged="2" fnchangedstate="true"/>"#);
//! node.tick(0).unwrap();
//!
//! // Verify via the driver
//! assert!(node.driver().outputs[1]);
//! ```
//!
//! [`ActuationDriver`]: crate::traits::ActuationDriver
//! [`IrTransmitter`]: crate::traits::IrTransmitter
//! [`BatterySensor`]: crate::traits::BatterySensor
//! [`Clock`]: crate::traits::Clock
//! [`IdentityStore`]: crate::identity::IdentityStore
//! [`MqttClient`]: crate::traits::MqttClient
//! [`Link`]: crate::traits::Link

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::FUNCTION_COUNT;
use crate::identity::IdentityStore;
use crate::traits::{
    ActuationDriver, BatterySensor, Clock, IrTransmitter, Link, MqttClient, MqttMessage,
    OutputRange, PfOutput,
};

/// Motor channels on a [`MockDriver`].
pub const MOCK_CHANNELS: usize = 2;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock actuation driver for testing.
///
/// Records the last level per channel and the state of every output. Use the
/// public fields to inspect state after test operations. Setting `fail`
/// makes every call return `Err(())` without changing anything;
/// `fail_power` does the same for motor calls only.
///
/// # Example
///
/// ```rust
/// use rs_loconode::hal::MockDriver;
/// use rs_loconode::traits::ActuationDriver;
///
/// let mut driver = MockDriver::new();
/// driver.set_power(1, -300).unwrap();
/// driver.stop().unwrap();
///
/// assert_eq!(driver.power, [0, 0]);
/// assert_eq!(driver.stop_calls, 1);
/// ```
#[derive(Debug)]
pub struct MockDriver {
    /// Last level per motor channel.
    pub power: [i32; MOCK_CHANNELS],
    /// Current state per function output.
    pub outputs: [bool; FUNCTION_COUNT],
    /// Native range reported to the controller.
    pub range: OutputRange,
    /// Number of `set_power` calls.
    pub power_calls: usize,
    /// Number of `set_output` calls.
    pub output_calls: usize,
    /// Number of `stop` calls.
    pub stop_calls: usize,
    /// Fail every call.
    pub fail: bool,
    /// Fail `set_power` and `stop` only.
    pub fail_power: bool,
}

impl MockDriver {
    /// Creates a mock driver with a `±1023` range.
    pub fn new() -> Self {
        Self::with_range(OutputRange::symmetric(1023))
    }

    /// Creates a mock driver with the given range, idle on its midpoint.
    pub fn with_range(range: OutputRange) -> Self {
        Self {
            power: [range.midpoint(); MOCK_CHANNELS],
            outputs: [false; FUNCTION_COUNT],
            range,
            power_calls: 0,
            output_calls: 0,
            stop_calls: 0,
            fail: false,
            fail_power: false,
        }
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuationDriver for MockDriver {
    type Error = ();

    fn output_range(&self) -> OutputRange {
        self.range
    }

    fn motor_channels(&self) -> usize {
        MOCK_CHANNELS
    }

    fn set_power(&mut self, channel: usize, level: i32) -> Result<(), ()> {
        if self.fail || self.fail_power {
            return Err(());
        }
        *self.power.get_mut(channel).ok_or(())? = self.range.clamp(level);
        self.power_calls += 1;
        Ok(())
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        *self.outputs.get_mut(index).ok_or(())? = on;
        self.output_calls += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ()> {
        if self.fail || self.fail_power {
            return Err(());
        }
        self.stop_calls += 1;
        self.power = [self.range.midpoint(); MOCK_CHANNELS];
        Ok(())
    }
}

/// A frame recorded by [`MockIrTransmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrFrame {
    /// `send_level` call.
    Level {
        /// Receiver channel.
        channel: u8,
        /// Receiver output.
        output: PfOutput,
        /// Signed level.
        level: i8,
    },
    /// `send_brake` call.
    Brake {
        /// Receiver channel.
        channel: u8,
        /// Receiver output.
        output: PfOutput,
    },
}

/// Mock IR transmitter that records every frame.
#[derive(Debug, Default)]
pub struct MockIrTransmitter {
    /// Frames in send order.
    pub sent: Vec<IrFrame>,
    /// Fail every call.
    pub fail: bool,
}

impl MockIrTransmitter {
    /// Creates an empty transmitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last frame sent to `output`, if any.
    pub fn last_for(&self, output: PfOutput) -> Option<IrFrame> {
        self.sent.iter().rev().copied().find(|f| match f {
            IrFrame::Level { output: o, .. } | IrFrame::Brake { output: o, .. } => *o == output,
        })
    }
}

impl IrTransmitter for MockIrTransmitter {
    type Error = ();

    fn send_level(&mut self, channel: u8, output: PfOutput, level: i8) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.sent.push(IrFrame::Level {
            channel,
            output,
            level,
        });
        Ok(())
    }

    fn send_brake(&mut self, channel: u8, output: PfOutput) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.sent.push(IrFrame::Brake { channel, output });
        Ok(())
    }
}

/// Mock battery sensor with a settable reading.
#[derive(Debug, Default)]
pub struct MockBattery {
    /// Value returned by `read_raw`.
    pub raw: u16,
    /// Number of reads.
    pub reads: usize,
    /// Fail every read.
    pub fail: bool,
}

impl MockBattery {
    /// Creates a sensor returning `raw`.
    pub fn new(raw: u16) -> Self {
        Self {
            raw,
            ..Default::default()
        }
    }
}

impl BatterySensor for MockBattery {
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        if self.fail {
            return Err(());
        }
        self.reads += 1;
        Ok(self.raw)
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_loconode::hal::MockClock;
/// use rs_loconode::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// In-memory identity store.
#[derive(Debug, Default)]
pub struct MockIdentityStore {
    /// Stored value.
    pub value: Option<u16>,
    /// Number of `store` calls.
    pub writes: usize,
    /// Fail every call.
    pub fail: bool,
}

impl MockIdentityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `value`.
    pub fn with_value(value: u16) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

impl IdentityStore for MockIdentityStore {
    type Error = ();

    fn load(&mut self) -> Result<Option<u16>, ()> {
        if self.fail {
            return Err(());
        }
        Ok(self.value)
    }

    fn store(&mut self, id: u16) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.value = Some(id);
        self.writes += 1;
        Ok(())
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages for testing message handling.
///
/// # Example
///
/// ```rust
/// use rs_loconode::hal::MockMqtt;
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("rocrail/service/command", br#"<sys cmd="go"/>"#.to_vec());
///
/// // Check subscriptions
/// mqtt.subscriptions.push("rocrail/service/command".into());
/// assert!(mqtt.is_subscribed("rocrail/service/command"));
///
/// // Check published messages
/// mqtt.published.push(("loconode/ping".into(), b"<ping/>".to_vec(), false));
/// assert_eq!(mqtt.published_to("loconode/ping").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
    /// Fail every publish.
    pub fail_publish: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ()> {
        if self.fail_publish || !self.connected {
            return Err(());
        }
        self.published
            .push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        if !self.connected {
            return Err(());
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if !self.connected || self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Mock network link.
#[derive(Debug, Default)]
pub struct MockLink {
    /// Whether the link reports itself up.
    pub up: bool,
    /// Number of `start_connect` calls.
    pub connect_calls: usize,
    /// Make `start_connect` fail.
    pub fail_connect: bool,
    /// Bring the link up as soon as a connect is started.
    pub connect_immediately: bool,
}

impl MockLink {
    /// Creates a link that is down.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Link for MockLink {
    type Error = ();

    fn is_up(&self) -> bool {
        self.up
    }

    fn start_connect(&mut self) -> Result<(), ()> {
        self.connect_calls += 1;
        if self.fail_connect {
            return Err(());
        }
        if self.connect_immediately {
            self.up = true;
        }
        Ok(())
    }
}
