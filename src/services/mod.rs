//! Loop services that connect a [`LocoNode`](crate::node::LocoNode) to the
//! broker.
//!
//! - `runner`: platform-agnostic loop body over any [`MqttClient`](crate::traits::MqttClient)
//! - `mqtt` feature: `rumqttc` bridge for desktop nodes
//!
//! ```ignore
//! use rs_loconode::services::NodeRunner;
//!
//! let mut runner = NodeRunner::new(node, client, battery, &config);
//! loop {
//!     runner.step(clock.now_ms())?;
//! }
//! ```

pub mod runner;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use runner::NodeRunner;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttBridge, MqttError};
