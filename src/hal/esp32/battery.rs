//! Battery voltage sensing via ESP32 ADC.
//!
//! The battery feeds GPIO0 (ADC1 channel 0) through a resistor divider so
//! that full charge stays below the 11dB input range. Scaling to millivolts
//! happens in [`BatteryConfig`](crate::config::BatteryConfig).

use crate::traits::BatterySensor;
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio0;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

/// Battery sensor on GPIO0.
///
/// # Example
///
/// ```ignore
/// use rs_loconode::hal::esp32::Esp32Battery;
/// use rs_loconode::traits::BatterySensor;
///
/// let adc = AdcDriver::new(peripherals.adc1)?;
/// let mut battery = Esp32Battery::new(&adc, peripherals.pins.gpio0)?;
/// let raw = battery.read_raw()?;
/// ```
pub struct Esp32Battery<'d> {
    channel: AdcChannelDriver<'d, Gpio0, &'d AdcDriver<'d, ADC1>>,
}

impl<'d> Esp32Battery<'d> {
    /// Creates the sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio0> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        Ok(Self {
            channel: AdcChannelDriver::new(adc, pin, &config)?,
        })
    }
}

impl BatterySensor for Esp32Battery<'_> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        self.channel.read()
    }
}
