//! Desktop locomotive node.
//!
//! Runs the full command pipeline against a real broker with a driver that
//! logs power levels and function outputs instead of driving hardware.
//! Useful for exercising a layout controller without a locomotive.
//!
//! # Environment
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `LOCO_CONFIG` | - | JSON config file, fields default when omitted |
//! | `MQTT_HOST` | `localhost` | Broker host (overrides the file) |
//! | `MQTT_PORT` | `1883` | Broker port (overrides the file) |
//! | `LOCO_ID` | - | Fixed identity; otherwise loaded from `LOCO_ID_FILE` |
//! | `LOCO_ID_FILE` | `loconode.id` | Where a generated identity is kept |
//! | `BATTERY_RAW` | `3000` | Simulated battery reading |
//! | `RUST_LOG` | `info` | Log filter |
//!
//! ```bash
//! RUST_LOG=debug MQTT_HOST=192.168.1.10 cargo run --features mqtt --bin desktop_node
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;

use rs_loconode::config::{Config, FUNCTION_COUNT};
use rs_loconode::hal::MockBattery;
use rs_loconode::services::{MqttBridge, NodeRunner};
use rs_loconode::traits::{ActuationDriver, Clock, OutputRange};
use rs_loconode::{messages, Identity, IdentityStore, LocoNode};

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let identity = load_identity()?;
    log::info!(
        "Node {} ({}) using broker {}:{}",
        identity,
        config.device.name,
        config.mqtt.host,
        config.mqtt.port
    );

    let will = messages::last_will(identity, config.mqtt.last_will_topic.as_str());
    let client = MqttBridge::connect(&config.mqtt, &config.mqtt.client_id(identity), &will);

    let raw = std::env::var("BATTERY_RAW")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let node = LocoNode::with_config(identity, LoggingDriver::new(), &config);
    let mut runner = NodeRunner::new(node, client, MockBattery::new(raw), &config);

    let clock = StdClock::new();
    let mut interval = tokio::time::interval(Duration::from_millis(LOOP_INTERVAL_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = runner.step(clock.now_ms()) {
                    log::error!("Actuation failed: {:?}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                runner.node_mut().driver_mut().stop()?;
                return Ok(());
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::var("LOCO_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path))?
        }
        Err(_) => Config::default(),
    };

    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.mqtt = config.mqtt.with_host(&host);
    }
    if let Ok(port) = std::env::var("MQTT_PORT") {
        let port = port.parse().context("MQTT_PORT")?;
        config.mqtt = config.mqtt.with_port(port);
    }
    Ok(config)
}

fn load_identity() -> anyhow::Result<Identity> {
    if let Ok(value) = std::env::var("LOCO_ID") {
        let value: u32 = value.parse().context("LOCO_ID")?;
        return Ok(Identity::new(value)?);
    }

    let path = std::env::var("LOCO_ID_FILE").unwrap_or_else(|_| "loconode.id".into());
    let mut store = FileStore {
        path: PathBuf::from(path),
    };
    let seed = || {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or(0)
    };
    Ok(Identity::acquire(&mut store, seed)?)
}

// ============================================================================
// Desktop stand-ins
// ============================================================================

/// Identity persisted as a decimal number in a text file.
struct FileStore {
    path: PathBuf,
}

impl IdentityStore for FileStore {
    type Error = std::io::Error;

    fn load(&mut self) -> Result<Option<u16>, Self::Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text.trim().parse().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&mut self, id: u16) -> Result<(), Self::Error> {
        std::fs::write(&self.path, format!("{}\n", id))
    }
}

/// Logs what a motor driver would do.
struct LoggingDriver {
    power: i32,
    outputs: [bool; FUNCTION_COUNT],
}

impl LoggingDriver {
    fn new() -> Self {
        Self {
            power: 0,
            outputs: [false; FUNCTION_COUNT],
        }
    }
}

impl ActuationDriver for LoggingDriver {
    type Error = core::convert::Infallible;

    fn output_range(&self) -> OutputRange {
        OutputRange::symmetric(1023)
    }

    fn motor_channels(&self) -> usize {
        1
    }

    fn set_power(&mut self, _channel: usize, level: i32) -> Result<(), Self::Error> {
        if level != self.power {
            log::info!("Motor power {} -> {}", self.power, level);
            self.power = level;
        }
        Ok(())
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), Self::Error> {
        if let Some(slot) = self.outputs.get_mut(index) {
            if *slot != on {
                log::info!("F{} {}", index + 1, if on { "on" } else { "off" });
                *slot = on;
            }
        }
        Ok(())
    }
}

struct StdClock {
    origin: Instant,
}

impl StdClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
