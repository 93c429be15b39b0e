//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for fixed-size storage while remaining
//! ergonomic to use on desktop.
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::config::{Config, MotionConfig, MqttConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_motion(MotionConfig::default().with_accel_step(1));
//! ```

use heapless::String as HString;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Number of function outputs on a node
pub const FUNCTION_COUNT: usize = 8;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Largest char boundary that fits
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete node configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Ramp configuration
    pub motion: MotionConfig,
    /// Function output configuration
    pub lights: LightConfig,
    /// Battery telemetry scaling
    pub battery: BatteryConfig,
    /// Device identification and driver selection
    pub device: DeviceConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set motion configuration
    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    /// Set light configuration
    pub fn with_lights(mut self, lights: LightConfig) -> Self {
        self.lights = lights;
        self
    }

    /// Set battery configuration
    pub fn with_battery(mut self, battery: BatteryConfig) -> Self {
        self.battery = battery;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID prefix; the node identity is appended
    pub client_id_prefix: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Shared command channel
    pub command_topic: LongString,
    /// Battery telemetry topic
    pub telemetry_topic: LongString,
    /// Liveness topic
    pub ping_topic: LongString,
    /// Last-will topic
    pub last_will_topic: LongString,
    /// Telemetry publish interval in milliseconds
    pub telemetry_interval_ms: u32,
    /// Ping publish interval in milliseconds
    pub ping_interval_ms: u32,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Delay between reconnection attempts in milliseconds
    pub reconnect_delay_ms: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id_prefix: short_string("loconode-"),
            username: ShortString::new(),
            password: ShortString::new(),
            command_topic: long_string("rocrail/service/command"),
            telemetry_topic: long_string("loconode/battery"),
            ping_topic: long_string("loconode/ping"),
            last_will_topic: long_string("loconode/lastwill"),
            telemetry_interval_ms: 10_000,
            ping_interval_ms: 5_000,
            keep_alive_secs: 30,
            reconnect_delay_ms: 5_000,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID prefix
    pub fn with_client_id_prefix(mut self, prefix: &str) -> Self {
        self.client_id_prefix = short_string(prefix);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the command topic
    pub fn with_command_topic(mut self, topic: &str) -> Self {
        self.command_topic = long_string(topic);
        self
    }

    /// Set the telemetry topic
    pub fn with_telemetry_topic(mut self, topic: &str) -> Self {
        self.telemetry_topic = long_string(topic);
        self
    }

    /// Set the telemetry interval
    pub fn with_telemetry_interval_ms(mut self, ms: u32) -> Self {
        self.telemetry_interval_ms = ms;
        self
    }

    /// Set the ping interval
    pub fn with_ping_interval_ms(mut self, ms: u32) -> Self {
        self.ping_interval_ms = ms;
        self
    }

    /// Set the reconnect delay
    pub fn with_reconnect_delay_ms(mut self, ms: u32) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }

    /// Client ID for a node with the given identity.
    pub fn client_id(&self, identity: crate::Identity) -> ShortString {
        let mut id = self.client_id_prefix.clone();
        let _ = core::fmt::Write::write_fmt(&mut id, format_args!("{}", identity));
        id
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Motion Config
// ============================================================================

/// Ramp parameters for the motion controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// Speed units added per step while speeding up
    pub accel_step: i32,
    /// Speed units removed per step while slowing down or reversing
    pub brake_step: i32,
    /// Minimum time between ramp steps in milliseconds
    pub ramp_interval_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            accel_step: 2,
            brake_step: 5,
            ramp_interval_ms: 50,
        }
    }
}

impl MotionConfig {
    /// Set the acceleration step (at least 1)
    pub fn with_accel_step(mut self, step: i32) -> Self {
        self.accel_step = step.max(1);
        self
    }

    /// Set the braking step (at least 1)
    pub fn with_brake_step(mut self, step: i32) -> Self {
        self.brake_step = step.max(1);
        self
    }

    /// Set the ramp interval
    pub fn with_ramp_interval_ms(mut self, ms: u32) -> Self {
        self.ramp_interval_ms = ms;
        self
    }
}

// ============================================================================
// Light Config
// ============================================================================

/// Function output configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LightConfig {
    /// Length of one on/off phase of the override blink pattern
    pub blink_period_ms: u32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            blink_period_ms: 500,
        }
    }
}

impl LightConfig {
    /// Set the blink period (at least 1ms)
    pub fn with_blink_period_ms(mut self, ms: u32) -> Self {
        self.blink_period_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Battery Config
// ============================================================================

/// Scaling from raw ADC readings to millivolts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatteryConfig {
    /// Raw value at full scale
    pub max_raw: u16,
    /// Battery voltage at full scale, including any divider
    pub full_scale_mv: u32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            max_raw: 4095,
            full_scale_mv: 13_200,
        }
    }
}

impl BatteryConfig {
    /// Set the full-scale raw value (at least 1)
    pub fn with_max_raw(mut self, raw: u16) -> Self {
        self.max_raw = raw.max(1);
        self
    }

    /// Set the full-scale voltage
    pub fn with_full_scale_mv(mut self, mv: u32) -> Self {
        self.full_scale_mv = mv;
        self
    }

    /// Convert a raw reading to millivolts.
    pub fn millivolts(&self, raw: u16) -> u32 {
        (raw as u64 * self.full_scale_mv as u64 / self.max_raw.max(1) as u64) as u32
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Delay between connection attempts in milliseconds
    pub retry_delay_ms: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            retry_delay_ms: 10_000,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the retry delay
    pub fn with_retry_delay_ms(mut self, ms: u32) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Which actuation driver family is wired to the node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DriverKind {
    /// Two PWM inputs per motor (L298N, BTS7960 style)
    #[default]
    DualHBridge,
    /// Phase + enable per motor (DRV8835 style)
    DualLogic,
    /// LEGO Power Functions infrared receiver
    IrSignal,
}

impl DriverKind {
    /// Parse a build-time or environment name (`hbridge`, `logic`, `ir`).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let is = |a: &str, b: &str| name.eq_ignore_ascii_case(a) || name.eq_ignore_ascii_case(b);
        if is("hbridge", "dual_h_bridge") {
            Some(Self::DualHBridge)
        } else if is("logic", "dual_logic") {
            Some(Self::DualLogic)
        } else if is("ir", "ir_signal") {
            Some(Self::IrSignal)
        } else {
            None
        }
    }
}

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
    /// Actuation driver family
    pub driver: DriverKind,
    /// Power Functions channel (0-3), used by the IR driver
    pub ir_channel: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("loconode"),
            driver: DriverKind::DualHBridge,
            ir_channel: 0,
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the driver family
    pub fn with_driver(mut self, driver: DriverKind) -> Self {
        self.driver = driver;
        self
    }

    /// Set the IR channel (masked to 0-3)
    pub fn with_ir_channel(mut self, channel: u8) -> Self {
        self.ir_channel = channel & 0x03;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identity;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(
            config.mqtt.command_topic.as_str(),
            "rocrail/service/command"
        );
        assert_eq!(config.motion.accel_step, 2);
        assert_eq!(config.motion.brake_step, 5);
        assert_eq!(config.lights.blink_period_ms, 500);
    }

    #[test]
    fn braking_faster_than_accelerating_by_default() {
        let motion = MotionConfig::default();
        assert!(motion.brake_step > motion.accel_step);
    }

    #[test]
    fn client_id_appends_identity() {
        let mqtt = MqttConfig::default();
        let id = mqtt.client_id(Identity::new(42).unwrap());
        assert_eq!(id.as_str(), "loconode-42");
    }

    #[test]
    fn mqtt_auth_detection() {
        let no_auth = MqttConfig::default();
        assert!(!no_auth.has_auth());

        let with_auth = MqttConfig::default().with_auth("user", "pass");
        assert!(with_auth.has_auth());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883)
                    .with_command_topic("layout/cmd"),
            )
            .with_motion(MotionConfig::default().with_ramp_interval_ms(20))
            .with_device(
                DeviceConfig::default()
                    .with_name("Crocodile")
                    .with_driver(DriverKind::IrSignal),
            );

        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.command_topic.as_str(), "layout/cmd");
        assert_eq!(config.motion.ramp_interval_ms, 20);
        assert_eq!(config.device.name.as_str(), "Crocodile");
        assert_eq!(config.device.driver, DriverKind::IrSignal);
    }

    #[test]
    fn motion_steps_at_least_one() {
        let motion = MotionConfig::default()
            .with_accel_step(0)
            .with_brake_step(-3);
        assert_eq!(motion.accel_step, 1);
        assert_eq!(motion.brake_step, 1);
    }

    #[test]
    fn ir_channel_masked() {
        let device = DeviceConfig::default().with_ir_channel(6);
        assert_eq!(device.ir_channel, 2);
    }

    #[test]
    fn battery_millivolts() {
        let battery = BatteryConfig::default()
            .with_max_raw(1023)
            .with_full_scale_mv(10_230);
        assert_eq!(battery.millivolts(0), 0);
        assert_eq!(battery.millivolts(512), 5_120);
        assert_eq!(battery.millivolts(1023), 10_230);
    }

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("Layout").is_configured());
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte chars: 64 is not a multiple of 3
        let input = "€".repeat(30);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    #[test]
    fn driver_kind_names() {
        assert_eq!(DriverKind::from_name("ir"), Some(DriverKind::IrSignal));
        assert_eq!(DriverKind::from_name(" Logic "), Some(DriverKind::DualLogic));
        assert_eq!(
            DriverKind::from_name("dual_h_bridge"),
            Some(DriverKind::DualHBridge)
        );
        assert_eq!(DriverKind::from_name("stepper"), None);
    }
}
