//! Actuation driver variants.
//!
//! Each driver family implements [`ActuationDriver`] on top of
//! `embedded-hal` 1.0 traits, so the same code runs on ESP32 LEDC/GPIO
//! drivers and on test pins.
//!
//! | Driver | Motor wiring | Native range |
//! |--------|--------------|--------------|
//! | [`DualHBridge`] | Two PWM inputs per motor (L298N, BTS7960) | `±max_duty` |
//! | [`DualLogic`] | Phase pin + enable PWM per motor (DRV8835) | `±max_duty` |
//! | [`IrSignal`] | LEGO Power Functions receiver over infrared | `-7..=7` |
//!
//! Function outputs are plain GPIO pins; the IR driver can additionally
//! bind outputs to receiver ports. Outputs with nothing attached accept
//! every state and do nothing.

extern crate alloc;
use alloc::vec::Vec;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::hal::power_functions::MAX_STEP;
use crate::traits::{ActuationDriver, IrTransmitter, OutputRange, PfOutput};

/// Errors from the concrete drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// PWM channel failed.
    #[error("pwm: {0:?}")]
    Pwm(pwm::ErrorKind),
    /// GPIO pin failed.
    #[error("pin: {0:?}")]
    Pin(digital::ErrorKind),
    /// Motor channel not wired.
    #[error("no motor channel {0}")]
    NoSuchChannel(usize),
    /// IR transmission failed.
    #[error("ir transmit failed")]
    Transmit,
}

fn pwm_err<E: pwm::Error>(e: E) -> DriverError {
    DriverError::Pwm(e.kind())
}

fn pin_err<E: digital::Error>(e: E) -> DriverError {
    DriverError::Pin(e.kind())
}

fn set_pin<L: OutputPin>(pin: &mut L, on: bool) -> Result<(), DriverError> {
    if on {
        pin.set_high().map_err(pin_err)
    } else {
        pin.set_low().map_err(pin_err)
    }
}

fn magnitude(level: i32) -> u16 {
    level.unsigned_abs().min(u32::from(u16::MAX)) as u16
}

// ============================================================================
// Dual H-bridge
// ============================================================================

/// PWM pair of one H-bridge motor.
#[derive(Debug)]
pub struct HBridgeChannel<P> {
    /// Driven for forward motion.
    pub forward: P,
    /// Driven for reverse motion.
    pub reverse: P,
}

/// Two PWM inputs per motor.
///
/// Forward drives `forward` with the duty and holds `reverse` at 0, reverse
/// the other way round. The idle side is always lowered first so both
/// inputs are never high together.
pub struct DualHBridge<P, L> {
    channels: Vec<HBridgeChannel<P>>,
    lights: Vec<L>,
    max_duty: u16,
}

impl<P: SetDutyCycle, L: OutputPin> DualHBridge<P, L> {
    /// Build from motor channels and light pins.
    ///
    /// The native range is the smallest `max_duty_cycle` of all PWM inputs.
    pub fn new(channels: Vec<HBridgeChannel<P>>, lights: Vec<L>) -> Self {
        let max_duty = channels
            .iter()
            .flat_map(|c| [c.forward.max_duty_cycle(), c.reverse.max_duty_cycle()])
            .min()
            .unwrap_or(0);
        Self {
            channels,
            lights,
            max_duty,
        }
    }

    /// A wired motor channel.
    pub fn channel(&self, index: usize) -> Option<&HBridgeChannel<P>> {
        self.channels.get(index)
    }

    /// A light pin.
    pub fn light(&self, index: usize) -> Option<&L> {
        self.lights.get(index)
    }
}

impl<P: SetDutyCycle, L: OutputPin> ActuationDriver for DualHBridge<P, L> {
    type Error = DriverError;

    fn output_range(&self) -> OutputRange {
        OutputRange::symmetric(i32::from(self.max_duty))
    }

    fn motor_channels(&self) -> usize {
        self.channels.len()
    }

    fn set_power(&mut self, channel: usize, level: i32) -> Result<(), DriverError> {
        let level = self.output_range().clamp(level);
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or(DriverError::NoSuchChannel(channel))?;
        let duty = magnitude(level);
        if level >= 0 {
            ch.reverse.set_duty_cycle(0).map_err(pwm_err)?;
            ch.forward.set_duty_cycle(duty).map_err(pwm_err)
        } else {
            ch.forward.set_duty_cycle(0).map_err(pwm_err)?;
            ch.reverse.set_duty_cycle(duty).map_err(pwm_err)
        }
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), DriverError> {
        match self.lights.get_mut(index) {
            Some(pin) => set_pin(pin, on),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Dual logic (phase/enable)
// ============================================================================

/// Phase pin and enable PWM of one motor.
#[derive(Debug)]
pub struct LogicChannel<D, P> {
    /// Low for forward, high for reverse.
    pub phase: D,
    /// Speed.
    pub enable: P,
}

/// Phase + enable per motor.
pub struct DualLogic<D, P, L> {
    channels: Vec<LogicChannel<D, P>>,
    lights: Vec<L>,
    max_duty: u16,
}

impl<D: OutputPin, P: SetDutyCycle, L: OutputPin> DualLogic<D, P, L> {
    /// Build from motor channels and light pins.
    pub fn new(channels: Vec<LogicChannel<D, P>>, lights: Vec<L>) -> Self {
        let max_duty = channels
            .iter()
            .map(|c| c.enable.max_duty_cycle())
            .min()
            .unwrap_or(0);
        Self {
            channels,
            lights,
            max_duty,
        }
    }

    /// A wired motor channel.
    pub fn channel(&self, index: usize) -> Option<&LogicChannel<D, P>> {
        self.channels.get(index)
    }

    /// A light pin.
    pub fn light(&self, index: usize) -> Option<&L> {
        self.lights.get(index)
    }
}

impl<D: OutputPin, P: SetDutyCycle, L: OutputPin> ActuationDriver for DualLogic<D, P, L> {
    type Error = DriverError;

    fn output_range(&self) -> OutputRange {
        OutputRange::symmetric(i32::from(self.max_duty))
    }

    fn motor_channels(&self) -> usize {
        self.channels.len()
    }

    fn set_power(&mut self, channel: usize, level: i32) -> Result<(), DriverError> {
        let level = self.output_range().clamp(level);
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or(DriverError::NoSuchChannel(channel))?;
        // Disable before flipping phase
        ch.enable.set_duty_cycle(0).map_err(pwm_err)?;
        set_pin(&mut ch.phase, level < 0)?;
        ch.enable.set_duty_cycle(magnitude(level)).map_err(pwm_err)
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), DriverError> {
        match self.lights.get_mut(index) {
            Some(pin) => set_pin(pin, on),
            None => Ok(()),
        }
    }
}

// ============================================================================
// IR signalling (Power Functions)
// ============================================================================

/// Where a function output goes on an IR node.
#[derive(Debug)]
pub enum LightBinding<L> {
    /// Local GPIO pin.
    Pin(L),
    /// Receiver port: on sends full forward, off sends brake.
    Ir(PfOutput),
    /// Nothing attached.
    Unbound,
}

/// LEGO Power Functions receiver driven over infrared.
///
/// Each motor channel maps to one receiver port.
pub struct IrSignal<T, L> {
    transmitter: T,
    ir_channel: u8,
    motors: Vec<PfOutput>,
    lights: Vec<LightBinding<L>>,
}

impl<T: IrTransmitter, L: OutputPin> IrSignal<T, L> {
    /// Build for receiver `ir_channel` (0-3).
    pub fn new(
        transmitter: T,
        ir_channel: u8,
        motors: Vec<PfOutput>,
        lights: Vec<LightBinding<L>>,
    ) -> Self {
        Self {
            transmitter,
            ir_channel: ir_channel & 0x03,
            motors,
            lights,
        }
    }

    /// The underlying transmitter.
    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    /// Receiver channel.
    pub fn ir_channel(&self) -> u8 {
        self.ir_channel
    }
}

impl<T: IrTransmitter, L: OutputPin> ActuationDriver for IrSignal<T, L> {
    type Error = DriverError;

    fn output_range(&self) -> OutputRange {
        OutputRange::symmetric(i32::from(MAX_STEP))
    }

    fn motor_channels(&self) -> usize {
        self.motors.len()
    }

    fn set_power(&mut self, channel: usize, level: i32) -> Result<(), DriverError> {
        let output = *self
            .motors
            .get(channel)
            .ok_or(DriverError::NoSuchChannel(channel))?;
        let step = self.output_range().clamp(level) as i8;
        let sent = if step == 0 {
            self.transmitter.send_brake(self.ir_channel, output)
        } else {
            self.transmitter.send_level(self.ir_channel, output, step)
        };
        sent.map_err(|_| DriverError::Transmit)
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), DriverError> {
        match self.lights.get_mut(index) {
            Some(LightBinding::Pin(pin)) => set_pin(pin, on),
            Some(LightBinding::Ir(output)) => {
                let output = *output;
                let sent = if on {
                    self.transmitter.send_level(self.ir_channel, output, MAX_STEP)
                } else {
                    self.transmitter.send_brake(self.ir_channel, output)
                };
                sent.map_err(|_| DriverError::Transmit)
            }
            Some(LightBinding::Unbound) | None => Ok(()),
        }
    }
}
