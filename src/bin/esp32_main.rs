//! ESP32-C3 SuperMini locomotive node.
//!
//! Boot sequence:
//! - load (or generate and persist) the node identity from NVS
//! - build the actuation driver selected by `LOCO_DRIVER`
//! - start WiFi and the MQTT client with its last will
//! - run the node loop: WiFi supervision, one command per step, ramp tick,
//!   telemetry
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=layout WIFI_PASSWORD=secret MQTT_HOST=192.168.1.10 \
//!     LOCO_DRIVER=hbridge cargo build --release --features esp32 --bin esp32_main
//! ```
//!
//! `LOCO_DRIVER` is one of `hbridge` (default), `logic` or `ir`. `IR_CHANNEL`
//! selects the Power Functions channel (0-3) for the IR driver.

use core::fmt::Debug;
use std::thread;
use std::time::Duration;

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::gpio::{AnyOutputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use rs_loconode::config::{Config, DeviceConfig, DriverKind, MqttConfig, WifiConfig};
use rs_loconode::connection::ConnectionMonitor;
use rs_loconode::hal::esp32::{
    Esp32Battery, Esp32Clock, Esp32IdentityStore, Esp32IrTransmitter, Esp32Mqtt, Esp32Wifi,
};
use rs_loconode::hal::{DualHBridge, DualLogic, HBridgeChannel, IrSignal, LightBinding, LogicChannel};
use rs_loconode::services::NodeRunner;
use rs_loconode::traits::{ActuationDriver, BatterySensor, Clock, Link, MqttClient, PfOutput};
use rs_loconode::{messages, Identity, LocoNode};

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 10;

/// Motor PWM frequency (above audible range)
const PWM_FREQ_HZ: u32 = 20_000;

type LightPin = PinDriver<'static, AnyOutputPin, Output>;

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = build_config();
    log::info!("rs-loconode '{}' starting", config.device.name);

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Identity
    // =========================================================================
    let mut store = Esp32IdentityStore::new(nvs.clone())?;
    // SAFETY: esp_random has no preconditions
    let identity = Identity::acquire(&mut store, || unsafe { esp_idf_sys::esp_random() })?;
    log::info!("Node identity {}", identity);

    // =========================================================================
    // Network
    // =========================================================================
    let wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
    let will = messages::last_will(identity, config.mqtt.last_will_topic.as_str());
    let mqtt = Esp32Mqtt::new(&config.mqtt, &config.mqtt.client_id(identity), &will)?;

    // =========================================================================
    // Battery sense (ADC1 on GPIO0)
    // =========================================================================
    let adc = AdcDriver::new(peripherals.adc1)?;
    let battery = Esp32Battery::new(&adc, peripherals.pins.gpio0)?;

    // =========================================================================
    // Function outputs (GPIO4-7)
    // =========================================================================
    let lights: Vec<LightPin> = vec![
        light_pin(peripherals.pins.gpio4)?,
        light_pin(peripherals.pins.gpio5)?,
        light_pin(peripherals.pins.gpio6)?,
        light_pin(peripherals.pins.gpio7)?,
    ];

    // =========================================================================
    // Actuation driver
    // =========================================================================
    let timer_config = TimerConfig::default()
        .frequency(PWM_FREQ_HZ.Hz())
        .resolution(Resolution::Bits10);

    match config.device.driver {
        DriverKind::DualHBridge => {
            let timer = LedcTimerDriver::new(peripherals.ledc.timer0, &timer_config)?;
            let forward = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio2)?;
            let reverse = LedcDriver::new(peripherals.ledc.channel1, &timer, peripherals.pins.gpio3)?;
            let driver = DualHBridge::new(vec![HBridgeChannel { forward, reverse }], lights);
            log::info!("Dual H-bridge driver on GPIO2/3");
            run(identity, driver, wifi, mqtt, battery, &config)
        }
        DriverKind::DualLogic => {
            let timer = LedcTimerDriver::new(peripherals.ledc.timer0, &timer_config)?;
            let phase = PinDriver::output(peripherals.pins.gpio2.downgrade_output())?;
            let enable = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio3)?;
            let driver = DualLogic::new(vec![LogicChannel { phase, enable }], lights);
            log::info!("Phase/enable driver on GPIO2/3");
            run(identity, driver, wifi, mqtt, battery, &config)
        }
        DriverKind::IrSignal => {
            let transmitter =
                Esp32IrTransmitter::new(peripherals.rmt.channel0, peripherals.pins.gpio10)?;
            let driver = IrSignal::new(
                transmitter,
                config.device.ir_channel,
                vec![PfOutput::Red, PfOutput::Blue],
                lights.into_iter().map(LightBinding::Pin).collect(),
            );
            log::info!("Power Functions IR on channel {}", config.device.ir_channel + 1);
            run(identity, driver, wifi, mqtt, battery, &config)
        }
    }
}

/// Node loop. Only returns on a setup error.
fn run<D, L, C, B>(
    identity: Identity,
    driver: D,
    mut wifi: L,
    mqtt: C,
    battery: B,
    config: &Config,
) -> anyhow::Result<()>
where
    D: ActuationDriver,
    D::Error: Debug,
    L: Link,
    C: MqttClient,
    C::Error: Debug,
    B: BatterySensor,
    B::Error: Debug,
{
    let clock = Esp32Clock::new();
    let node = LocoNode::with_config(identity, driver, config);
    let mut runner = NodeRunner::new(node, mqtt, battery, config);
    let mut monitor = ConnectionMonitor::new(config.wifi.retry_delay_ms);

    log::info!("Listening on {}", config.mqtt.command_topic);

    loop {
        let now = clock.now_ms();

        monitor.poll(now, &mut wifi);

        if let Err(e) = runner.step(now) {
            log::error!("Actuation failed: {:?}", e);
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}

fn light_pin(pin: impl OutputPin + 'static) -> anyhow::Result<LightPin> {
    Ok(PinDriver::output(pin.downgrade_output())?)
}

/// Build-time configuration from environment variables.
fn build_config() -> Config {
    let mut mqtt = MqttConfig::default()
        .with_host(option_env!("MQTT_HOST").unwrap_or("localhost"))
        .with_port(
            option_env!("MQTT_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(1883),
        );
    if let Some(user) = option_env!("MQTT_USER") {
        mqtt = mqtt.with_auth(user, option_env!("MQTT_PASSWORD").unwrap_or(""));
    }

    let driver = option_env!("LOCO_DRIVER")
        .and_then(DriverKind::from_name)
        .unwrap_or_default();
    let ir_channel = option_env!("IR_CHANNEL")
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);

    Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(mqtt)
        .with_device(
            DeviceConfig::default()
                .with_name(option_env!("LOCO_NAME").unwrap_or("loconode"))
                .with_driver(driver)
                .with_ir_channel(ir_channel),
        )
}
