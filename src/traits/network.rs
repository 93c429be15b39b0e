//! Network abstraction traits for MQTT and link connectivity.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MqttClient`] | Pub/sub messaging with the command channel |
//! | [`Link`] | A connection that can be polled and (re)started without blocking |
//!
//! # Topics
//!
//! ```text
//! rocrail/service/command  - inbound <lc/>, <fn/>, <sys/> commands
//! loconode/battery         - periodic battery telemetry
//! loconode/ping            - liveness
//! loconode/lastwill        - delivered by the broker on unclean disconnect
//! ```

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// MQTT Client Trait (Sync-First Design)
// ============================================================================

/// MQTT client trait for pub/sub messaging.
///
/// Sync-first so it works on ESP32 (blocking I/O) and on desktop behind a
/// channel bridge.
///
/// # Implementation Notes
///
/// - `try_recv` must never block
/// - The client reconnects on its own; `is_connected` reports the session
///   state so callers can re-subscribe after a reconnect
///
/// # Example
///
/// ```rust,ignore
/// use rs_loconode::traits::MqttClient;
///
/// fn ping<M: MqttClient>(client: &mut M) {
///     client.publish("loconode/ping", br#"<ping id="loco42"/>"#, false).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error;

    /// Publish a message to a topic.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;
}

/// Inbound messages a client buffers between polls. Further messages are
/// dropped until the runner catches up.
pub const INBOX_CAPACITY: usize = 16;

/// An MQTT message received from a subscription.
#[derive(Clone, Debug)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

/// Last-will registration passed to a client at connect time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastWill {
    /// Topic the broker publishes to.
    pub topic: String,
    /// Will payload.
    pub payload: Vec<u8>,
    /// Retain flag.
    pub retain: bool,
}

// ============================================================================
// Link Trait
// ============================================================================

/// A network link that is started and observed without blocking.
///
/// Polled by [`ConnectionMonitor`](crate::connection::ConnectionMonitor) from the
/// control loop.
pub trait Link {
    /// Error type for connection attempts.
    type Error: core::fmt::Debug;

    /// True once the link is usable.
    fn is_up(&self) -> bool;

    /// Begin a connection attempt and return immediately.
    fn start_connect(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_str_valid_utf8() {
        let msg = MqttMessage::new("rocrail/service/command", br#"<sys cmd="go"/>"#.to_vec());
        assert_eq!(msg.payload_str(), Some(r#"<sys cmd="go"/>"#));
    }

    #[test]
    fn payload_str_invalid_utf8() {
        let msg = MqttMessage::new("t", vec![0xff, 0xfe]);
        assert_eq!(msg.payload_str(), None);
    }
}
