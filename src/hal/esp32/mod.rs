//! ESP32-C3 SuperMini hardware abstraction layer for a locomotive node.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash)
//! - **Motor Driver**: dual H-bridge (L298N/BTS7960) or phase/enable (DRV8835)
//! - **Lights**: four GPIO outputs
//! - **IR**: 940nm LED on an RMT channel for LEGO Power Functions receivers
//! - **Battery**: resistor divider into ADC1
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments matching the SuperMini layout.

mod battery;
mod clock;
mod ir;
mod mqtt;
mod nvs;
mod wifi;

pub use battery::Esp32Battery;
pub use clock::Esp32Clock;
pub use ir::Esp32IrTransmitter;
pub use mqtt::{Esp32Mqtt, Esp32MqttError};
pub use nvs::Esp32IdentityStore;
pub use wifi::Esp32Wifi;

/// Pin assignments for SuperMini ESP32-C3.
pub mod pins {
    // =========================================================================
    // Motor Control
    // =========================================================================

    /// H-bridge forward input, or phase pin on a phase/enable driver
    pub const MOTOR_A: i32 = 2;

    /// H-bridge reverse input, or enable PWM on a phase/enable driver
    pub const MOTOR_B: i32 = 3;

    // =========================================================================
    // Function Outputs
    // =========================================================================

    /// F1 - front light
    pub const LIGHT_1: i32 = 4;

    /// F2 - rear light
    pub const LIGHT_2: i32 = 5;

    /// F3 - cab light
    pub const LIGHT_3: i32 = 6;

    /// F4 - auxiliary
    pub const LIGHT_4: i32 = 7;

    // =========================================================================
    // Sensing and IR
    // =========================================================================

    /// Battery divider input (ADC1 channel 0)
    pub const BATTERY_SENSE: i32 = 0;

    /// IR LED (RMT channel 0)
    pub const IR_LED: i32 = 10;
}
