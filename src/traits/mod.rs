//! Trait definitions for hardware abstraction and networking.
//!
//! This module defines the core abstractions that allow rs-loconode to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Drive different motor driver families through one interface
//! - Use different network implementations
//!
//! # Submodules
//!
//! - `hardware`: Actuation drivers, IR transmitter, battery sensor, clock
//! - `network`: MQTT client and link traits
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`ActuationDriver`]: Signed motor power and binary function outputs
//! - [`IrTransmitter`]: LEGO Power Functions infrared frames
//! - [`BatterySensor`]: Raw battery voltage sampling
//! - [`Clock`]: Monotonic time source

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
