//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `drivers`: Motor driver families over `embedded-hal` 1.0 traits
//! - `power_functions`: LEGO Power Functions IR frame encoding
//! - `mock`: Test implementations for desktop development
//! - `esp32`: ESP32-C3 node with LEDC motor PWM, ADC battery sense and RMT IR (requires `esp32` feature)

pub mod drivers;
pub mod mock;
pub mod power_functions;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use drivers::{
    DriverError, DualHBridge, DualLogic, HBridgeChannel, IrSignal, LightBinding, LogicChannel,
};
pub use mock::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
