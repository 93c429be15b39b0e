//! Power Functions IR transmitter on the ESP32 RMT peripheral.
//!
//! The RMT channel runs at 1 tick per microsecond with a 38kHz carrier on
//! the high level, so frame timings from
//! [`power_functions`](crate::hal::power_functions) go straight into pulses.

use crate::hal::power_functions::{Frame, CARRIER_HZ, REPEAT_COUNT, SYMBOLS_PER_FRAME};
use crate::traits::{IrTransmitter, PfOutput};
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::{CarrierConfig, DutyPercent, TransmitConfig};
use esp_idf_hal::rmt::{FixedLengthSignal, PinState, Pulse, PulseTicks, RmtChannel, TxRmtDriver};
use esp_idf_hal::sys::EspError;
use esp_idf_hal::units::FromValueType;

/// APB clock / 80 = 1MHz
const CLOCK_DIVIDER: u8 = 80;

/// IR LED driver.
pub struct Esp32IrTransmitter<'d> {
    tx: TxRmtDriver<'d>,
    toggle: bool,
}

impl<'d> Esp32IrTransmitter<'d> {
    /// Creates the transmitter on `pin`.
    ///
    /// # Errors
    ///
    /// Returns an error if RMT initialization fails.
    pub fn new<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'd,
        pin: impl Peripheral<P = impl OutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let carrier = CarrierConfig::new()
            .frequency(CARRIER_HZ.Hz())
            .carrier_level(PinState::High)
            .duty_percent(DutyPercent::new(33)?);
        let config = TransmitConfig::new()
            .clock_divider(CLOCK_DIVIDER)
            .carrier(Some(carrier));
        Ok(Self {
            tx: TxRmtDriver::new(channel, pin, &config)?,
            toggle: false,
        })
    }

    fn send(&mut self, frame: Frame) -> Result<(), EspError> {
        self.toggle = !self.toggle;
        let symbols = frame.with_toggle(self.toggle).symbols();

        let mut signal = FixedLengthSignal::<SYMBOLS_PER_FRAME>::new();
        for (i, &(mark, space)) in symbols.iter().enumerate() {
            let high = Pulse::new(PinState::High, PulseTicks::new(mark)?);
            let low = Pulse::new(PinState::Low, PulseTicks::new(space)?);
            signal.set(i, &(high, low))?;
        }
        for _ in 0..REPEAT_COUNT {
            self.tx.start_blocking(&signal)?;
        }
        Ok(())
    }
}

impl IrTransmitter for Esp32IrTransmitter<'_> {
    type Error = EspError;

    fn send_level(&mut self, channel: u8, output: PfOutput, level: i8) -> Result<(), EspError> {
        self.send(Frame::level(channel, output, level))
    }

    fn send_brake(&mut self, channel: u8, output: PfOutput) -> Result<(), EspError> {
        self.send(Frame::brake(channel, output))
    }
}
