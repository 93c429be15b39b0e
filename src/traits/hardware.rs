//! Hardware abstraction traits for actuation, sensing and time.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ActuationDriver`] | Signed motor power and binary function outputs |
//! | [`IrTransmitter`] | Infrared receiver signalling (LEGO Power Functions) |
//! | [`BatterySensor`] | Raw battery voltage sampling |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! The motion and function controllers depend only on [`ActuationDriver`],
//! never on which driver family sits behind it. Concrete drivers live in
//! [`crate::hal::drivers`]; test doubles in [`crate::hal::mock`].
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::traits::ActuationDriver;
//! use rs_loconode::hal::MockDriver;
//!
//! let mut driver = MockDriver::new();
//! driver.set_power(0, 512).unwrap();
//! driver.set_output(2, true).unwrap();
//!
//! assert_eq!(driver.power[0], 512);
//! assert!(driver.outputs[2]);
//! ```

/// Native output range of a motor driver.
///
/// Signed speeds in `[-max_speed, max_speed]` are mapped linearly onto
/// `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputRange {
    /// Level for full reverse.
    pub min: i32,
    /// Level for full forward.
    pub max: i32,
}

impl OutputRange {
    /// A range symmetric around zero.
    pub const fn symmetric(limit: i32) -> Self {
        Self {
            min: -limit,
            max: limit,
        }
    }

    /// The level that means "no power".
    #[inline]
    pub const fn midpoint(&self) -> i32 {
        self.min + (self.max - self.min) / 2
    }

    /// Clamp a level into the range.
    #[inline]
    pub fn clamp(&self, level: i32) -> i32 {
        level.clamp(self.min, self.max)
    }
}

/// Actuation capability of a locomotive driver.
///
/// # Implementation Notes
///
/// - `set_power` receives a level already mapped into [`output_range`](Self::output_range)
/// - `set_output` is called only when the applied state changes
/// - Channels and outputs are zero-based
pub trait ActuationDriver {
    /// Error type for actuation.
    type Error;

    /// Native power range of this driver.
    fn output_range(&self) -> OutputRange;

    /// Number of motor channels driven with the same level.
    fn motor_channels(&self) -> usize;

    /// Set signed power on one motor channel.
    fn set_power(&mut self, channel: usize, level: i32) -> Result<(), Self::Error>;

    /// Switch one function output.
    fn set_output(&mut self, index: usize, on: bool) -> Result<(), Self::Error>;

    /// Remove power from every motor channel.
    fn stop(&mut self) -> Result<(), Self::Error> {
        let idle = self.output_range().midpoint();
        for channel in 0..self.motor_channels() {
            self.set_power(channel, idle)?;
        }
        Ok(())
    }
}

/// Power Functions output on an IR receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PfOutput {
    /// Red output.
    Red,
    /// Blue output.
    Blue,
}

/// Infrared transmitter for LEGO Power Functions receivers.
pub trait IrTransmitter {
    /// Error type for transmission.
    type Error;

    /// Send a single-output PWM frame. `level` is in `-7..=7`.
    fn send_level(&mut self, channel: u8, output: PfOutput, level: i8)
        -> Result<(), Self::Error>;

    /// Send a brake-then-float frame.
    fn send_brake(&mut self, channel: u8, output: PfOutput) -> Result<(), Self::Error>;
}

/// Battery voltage sampling.
pub trait BatterySensor {
    /// Error type for sampling.
    type Error;

    /// Read the raw ADC value.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Time source.
///
/// Provides monotonic time in milliseconds for ramp pacing, blink timing
/// and housekeeping cadence.
///
/// # Example
///
/// ```rust
/// use rs_loconode::traits::Clock;
/// use rs_loconode::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
