//! Non-blocking WiFi station link for ESP32-C3.
//!
//! The driver is configured and started once; connecting is only
//! *requested* through [`Link::start_connect`] and observed through
//! [`Link::is_up`], so the control loop keeps ticking while the radio
//! associates and DHCP runs.
//!
//! # Example
//!
//! ```ignore
//! use rs_loconode::connection::ConnectionMonitor;
//! use rs_loconode::hal::esp32::Esp32Wifi;
//! use rs_loconode::config::WifiConfig;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("Layout")
//!     .with_password("secret123");
//!
//! let mut wifi = Esp32Wifi::new(modem, sysloop, Some(nvs), &config)?;
//! let mut monitor = ConnectionMonitor::new(config.retry_delay_ms);
//! loop {
//!     monitor.poll(clock.now_ms(), &mut wifi);
//!     // ...
//! }
//! ```

use crate::config::WifiConfig;
use crate::traits::Link;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use std::net::Ipv4Addr;

/// WiFi station link.
pub struct Esp32Wifi<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> Esp32Wifi<'a> {
    /// Configure station mode and start the driver. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns an error if driver initialization or configuration fails.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;

        // esp-idf wants its own fixed-size strings
        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());
        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            ..Default::default()
        }))?;
        wifi.start()?;
        log::info!("WiFi started for '{}'", config.ssid);

        Ok(Self { wifi })
    }

    /// Current IP address, if the interface is up.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }
}

impl Link for Esp32Wifi<'_> {
    type Error = EspError;

    fn is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn start_connect(&mut self) -> Result<(), EspError> {
        // Drop a half-open association before retrying
        if self.wifi.is_connected().unwrap_or(false) {
            self.wifi.disconnect()?;
        }
        self.wifi.connect()
    }
}
