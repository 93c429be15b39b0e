//! Outbound message payloads.
//!
//! Telemetry uses the same markup dialect as inbound commands so a layout
//! controller can read it with the same parser:
//!
//! ```text
//! <battery id="loco42" raw="2048" mV="6601"/>   periodic battery report
//! <ping id="loco42"/>                           liveness
//! <status id="loco42" state="disconnected"/>    last will
//! ```
//!
//! # Example
//!
//! ```
//! use rs_loconode::{Identity, messages::{BatteryReport, ping}};
//! use rs_loconode::config::BatteryConfig;
//!
//! let id = Identity::new(42).unwrap();
//! let report = BatteryReport::new(id, 2048, &BatteryConfig::default());
//! assert_eq!(report.to_payload(), r#"<battery id="loco42" raw="2048" mV="6601"/>"#);
//! assert_eq!(ping(id), r#"<ping id="loco42"/>"#);
//! ```

use alloc::format;
use alloc::string::String;

use crate::config::BatteryConfig;
use crate::identity::Identity;
use crate::traits::LastWill;

/// State marker carried by the last will.
pub const DISCONNECTED: &str = "disconnected";

/// A single battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryReport {
    /// Reporting node.
    pub identity: Identity,
    /// Raw ADC value.
    pub raw: u16,
    /// Derived battery voltage in millivolts.
    pub millivolts: u32,
}

impl BatteryReport {
    /// Build a report from a raw reading.
    pub fn new(identity: Identity, raw: u16, battery: &BatteryConfig) -> Self {
        Self {
            identity,
            raw,
            millivolts: battery.millivolts(raw),
        }
    }

    /// Encode for publishing.
    pub fn to_payload(&self) -> String {
        format!(
            r#"<battery id="{}" raw="{}" mV="{}"/>"#,
            self.identity.label(),
            self.raw,
            self.millivolts
        )
    }
}

/// Liveness payload.
pub fn ping(identity: Identity) -> String {
    format!(r#"<ping id="{}"/>"#, identity.label())
}

/// Last-will payload.
pub fn last_will_payload(identity: Identity) -> String {
    format!(
        r#"<status id="{}" state="{}"/>"#,
        identity.label(),
        DISCONNECTED
    )
}

/// Last-will registration for `topic`.
pub fn last_will(identity: Identity, topic: &str) -> LastWill {
    LastWill {
        topic: topic.into(),
        payload: last_will_payload(identity).into_bytes(),
        retain: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Document;

    fn id() -> Identity {
        Identity::new(42).unwrap()
    }

    #[test]
    fn battery_payload() {
        let battery = BatteryConfig::default()
            .with_max_raw(1000)
            .with_full_scale_mv(10_000);
        let report = BatteryReport::new(id(), 740, &battery);
        assert_eq!(report.millivolts, 7_400);
        assert_eq!(
            report.to_payload(),
            r#"<battery id="loco42" raw="740" mV="7400"/>"#
        );
    }

    #[test]
    fn battery_payload_parses_back() {
        let report = BatteryReport::new(id(), 4095, &BatteryConfig::default());
        let doc = Document::parse(&report.to_payload()).unwrap();
        let root = doc.top_level("battery").unwrap();
        assert_eq!(root.str_attribute("id"), Ok("loco42"));
        assert_eq!(root.int_attribute("mV"), Ok(13_200));
    }

    #[test]
    fn ping_payload() {
        assert_eq!(ping(id()), r#"<ping id="loco42"/>"#);
    }

    #[test]
    fn last_will_registration() {
        let will = last_will(id(), "loconode/lastwill");
        assert_eq!(will.topic, "loconode/lastwill");
        assert_eq!(
            will.payload,
            br#"<status id="loco42" state="disconnected"/>"#.to_vec()
        );
        assert!(!will.retain);
    }
}
