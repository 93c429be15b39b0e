//! # rs-loconode
//!
//! A remote-controlled locomotive node. Layout controllers publish
//! `<lc/>`, `<fn/>` and `<sys/>` commands on a shared MQTT channel; each
//! node accepts the ones addressed to its identity and drives its motor
//! and function outputs accordingly.
//!
//! ## Features
//!
//! - **Command pipeline**: tolerant XML parsing, address filtering, typed commands
//! - **Ramped motion**: speed approaches its target in fixed steps, braking faster than accelerating
//! - **Derived lighting**: direction changes switch the front/rear lights
//! - **Safety override**: a layout-wide stop that halts the motor and blinks the lights
//! - **Driver families**: dual H-bridge, phase/enable and LEGO Power Functions IR
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `parsing` / `commands` / `router` - Payload to typed command
//! - `motion` / `lights` / `safety` - Node state machines
//! - `node` - Ties the above to an actuation driver
//! - `services` - Loop body that connects a node to the broker
//! - `traits` - Hardware and network abstractions
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_loconode::{hal::MockDriver, Identity, LocoNode};
//!
//! let mut node = LocoNode::new(Identity::new(42).unwrap(), MockDriver::new());
//!
//! let outcome =
//!     node.handle_message(br#"<lc id="ice" addr="42" dir="true" V="50" V_max="100"/>"#);
//! assert!(outcome.is_applied());
//!
//! // Ramp at the default 2 units per 50ms
//! for t in 0..25 {
//!     node.tick(t * 50).unwrap();
//! }
//! assert_eq!(node.state().current_speed, 50);
//! ```

#![warn(missing_docs)]

extern crate alloc;

/// Typed commands, rejection reasons and message outcomes.
pub mod commands;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Non-blocking link supervision.
pub mod connection;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Node identity and its persistence seam.
pub mod identity;
/// Function outputs, derived lighting and blinking.
pub mod lights;
/// Outbound telemetry, ping and last-will payloads.
pub mod messages;
/// Speed ramping and power level mapping.
pub mod motion;
/// The node: router, motion, lights and safety over one driver.
pub mod node;
/// XML-like command payload parsing.
pub mod parsing;
/// Kind dispatch and address filtering.
pub mod router;
/// Layout-wide stop/go override.
pub mod safety;
/// Loop services connecting a node to the broker.
pub mod services;
/// Core traits for hardware and network abstraction.
pub mod traits;

// Re-exports for convenience
pub use commands::{
    Command, Direction, FunctionCommand, LocoCommand, MessageOutcome, RejectReason,
    SystemCommand, SystemKind,
};
pub use config::{Config, DeviceConfig, DriverKind, MqttConfig, WifiConfig};
pub use connection::{ConnectionMonitor, ConnectionState};
pub use identity::{Identity, IdentityError, IdentityStore};
pub use lights::{FunctionController, LightEvent};
pub use motion::{MotionController, MotionState, MotionStep, StepKind};
pub use node::{LocoNode, NodeState};
pub use parsing::{Document, ParseError};
pub use router::CommandRouter;
pub use safety::SafetyOverride;
pub use traits::{
    // Hardware
    ActuationDriver,
    BatterySensor,
    Clock,
    IrTransmitter,
    // Network
    LastWill,
    Link,
    MqttClient,
    MqttMessage,
    OutputRange,
    PfOutput,
};
