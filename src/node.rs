//! Node controller that ties everything together.
//!
//! [`LocoNode`] is the single controller context of a locomotive. It owns
//! the router, the motion and function controllers, the safety override and
//! the actuation driver. Nothing is shared: the owner calls
//! [`handle_message`](LocoNode::handle_message) for each inbound payload
//! and [`tick`](LocoNode::tick) from its loop.
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::{Identity, LocoNode, hal::MockDriver};
//!
//! let mut node = LocoNode::new(Identity::new(42).unwrap(), MockDriver::new());
//!
//! let outcome = node.handle_message(br#"<lc id="t1" addr="42" dir="true" V="10" V_max="100"/>"#);
//! assert!(outcome.is_applied());
//!
//! // Main loop - call tick() often; ramp steps are paced internally
//! for t in 0..10 {
//!     node.tick(t * 50).unwrap();
//! }
//! assert_eq!(node.state().current_speed, 10);
//! ```
//!
//! # Safety override
//!
//! ```rust
//! use rs_loconode::{Identity, LocoNode, hal::MockDriver};
//!
//! let mut node = LocoNode::new(Identity::new(42).unwrap(), MockDriver::new());
//! node.handle_message(br#"<sys cmd="ebreak"/>"#);
//! node.tick(0).unwrap();
//! assert!(node.state().override_active);
//!
//! node.handle_message(br#"<sys cmd="go"/>"#);
//! assert!(!node.state().override_active);
//! ```

use crate::commands::{Command, MessageOutcome, RejectReason};
use crate::config::{Config, FUNCTION_COUNT};
use crate::identity::Identity;
use crate::lights::FunctionController;
use crate::motion::{power_level, MotionController, StepKind};
use crate::parsing::Document;
use crate::router::CommandRouter;
use crate::safety::SafetyOverride;
use crate::traits::ActuationDriver;

/// Controller context for one locomotive.
///
/// # Type Parameter
///
/// - `D`: the actuation driver ([`ActuationDriver`] trait)
///
/// # Thread Safety
///
/// Not thread-safe and not meant to be. Run it from a single loop; see
/// [`NodeRunner`](crate::services::NodeRunner).
pub struct LocoNode<D: ActuationDriver> {
    router: CommandRouter,
    motion: MotionController,
    functions: FunctionController,
    safety: SafetyOverride,
    driver: D,
    applied_level: Option<i32>,
}

impl<D: ActuationDriver> LocoNode<D> {
    /// Create a node with default motion and light settings.
    pub fn new(identity: Identity, driver: D) -> Self {
        Self::with_config(identity, driver, &Config::default())
    }

    /// Create a node using the motion and light sections of `config`.
    pub fn with_config(identity: Identity, driver: D, config: &Config) -> Self {
        Self {
            router: CommandRouter::new(identity, FUNCTION_COUNT),
            motion: MotionController::new(config.motion),
            functions: FunctionController::new(config.lights),
            safety: SafetyOverride::new(),
            driver,
            applied_level: None,
        }
    }

    /// Parse, route and apply one inbound payload.
    ///
    /// Never fails: anything that is not applied leaves state unchanged and
    /// is reported in the outcome.
    pub fn handle_message(&mut self, payload: &[u8]) -> MessageOutcome {
        let doc = match Document::from_bytes(payload) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Discarding malformed message: {}", e);
                return MessageOutcome::Malformed(e);
            }
        };

        match self.router.route(&doc) {
            Ok(cmd) => self.apply(cmd),
            Err(reason) => {
                match &reason {
                    RejectReason::AddressMismatch { address, .. } => {
                        log::debug!("Ignoring command for address {}", address)
                    }
                    other => log::warn!("Rejected command: {}", other),
                }
                MessageOutcome::Rejected(reason)
            }
        }
    }

    /// Apply an already routed command.
    pub fn apply(&mut self, cmd: Command) -> MessageOutcome {
        match &cmd {
            Command::Loco(lc) => {
                if self.motion.set_target(lc) {
                    log::info!(
                        "Speed clamped to new scale {} (now {})",
                        lc.max_velocity,
                        self.motion.current()
                    );
                }
                log::info!(
                    "lc {}: target {} of {} ({})",
                    lc.id,
                    self.motion.target(),
                    lc.max_velocity,
                    lc.direction.as_str()
                );
            }
            Command::Function(f) => {
                self.functions.set_desired(f.index, f.state);
                log::info!("fn {}: F{} -> {}", f.id, f.index + 1, f.state);
            }
            Command::System(sys) => {
                if sys.kind.override_request().is_none() {
                    log::info!("sys {:?} has no effect", sys.kind);
                    return MessageOutcome::Ignored(sys.kind.clone());
                }
                self.safety.apply(&sys.kind);
            }
        }
        MessageOutcome::Applied(cmd)
    }

    /// Run one control tick: motion, then power, then function outputs.
    ///
    /// Actuation is only issued for changes. A failed driver call leaves the
    /// applied state as it was, so the same change is retried next tick.
    /// Function outputs are reconciled even when motor actuation fails; the
    /// motor error is returned first.
    pub fn tick(&mut self, now_ms: u64) -> Result<(), D::Error> {
        let override_active = self.safety.is_active();

        let mut power = Ok(());
        if let Some(step) = self.motion.tick(now_ms, override_active) {
            log::debug!("Speed {} -> {} ({:?})", step.previous, step.current, step.kind);
            if let Some(event) = step.light_event {
                self.functions.apply_light_event(event);
            }
            if step.kind == StepKind::OverrideStop {
                self.applied_level = None;
                power = self.driver.stop();
                if power.is_ok() {
                    self.applied_level = Some(self.driver.output_range().midpoint());
                }
            }
        }

        if power.is_ok() {
            power = self.apply_power();
        }
        let outputs = self
            .functions
            .reconcile(now_ms, override_active, &mut self.driver);

        power?;
        outputs?;
        Ok(())
    }

    fn apply_power(&mut self) -> Result<(), D::Error> {
        let level = power_level(
            self.motion.current(),
            self.motion.max(),
            self.driver.output_range(),
        );
        if self.applied_level == Some(level) {
            return Ok(());
        }
        for channel in 0..self.driver.motor_channels() {
            self.driver.set_power(channel, level)?;
        }
        self.applied_level = Some(level);
        Ok(())
    }

    /// Snapshot for diagnostics.
    pub fn state(&self) -> NodeState {
        let motion = self.motion.state();
        NodeState {
            identity: self.router.identity(),
            current_speed: motion.current,
            target_speed: motion.target,
            max_speed: motion.max,
            override_active: self.safety.is_active(),
            desired: *self.functions.desired(),
            actual: *self.functions.actual(),
        }
    }

    /// This node's identity.
    pub fn identity(&self) -> Identity {
        self.router.identity()
    }

    /// The motion controller.
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    /// The function controller.
    pub fn functions(&self) -> &FunctionController {
        &self.functions
    }

    /// The safety override.
    pub fn safety(&self) -> &SafetyOverride {
        &self.safety
    }

    /// The actuation driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the actuation driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

/// Snapshot of node state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeState {
    /// Node identity.
    pub identity: Identity,
    /// Applied speed.
    pub current_speed: i32,
    /// Commanded speed.
    pub target_speed: i32,
    /// Speed scale.
    pub max_speed: i32,
    /// Whether the safety override is active.
    pub override_active: bool,
    /// Desired function outputs.
    pub desired: [bool; FUNCTION_COUNT],
    /// Applied function outputs.
    pub actual: [bool; FUNCTION_COUNT],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::SystemKind;
    use crate::hal::MockDriver;
    use crate::parsing::ParseError;

    fn node() -> LocoNode<MockDriver> {
        LocoNode::new(Identity::new(42).unwrap(), MockDriver::new())
    }

    #[test]
    fn first_tick_idles_motor() {
        let mut node = node();
        node.tick(0).unwrap();
        assert_eq!(node.driver().power[0], 0);
        assert_eq!(node.driver().power_calls, node.driver().motor_channels());

        // Nothing changes, nothing is sent
        node.tick(50).unwrap();
        assert_eq!(node.driver().power_calls, node.driver().motor_channels());
    }

    #[test]
    fn loco_command_drives_every_channel() {
        let mut node = node();
        node.handle_message(br#"<lc id="t1" addr="42" dir="true" V="100" V_max="100"/>"#);
        node.tick(0).unwrap();

        let range = node.driver().output_range();
        let expected = power_level(2, 100, range);
        for channel in 0..node.driver().motor_channels() {
            assert_eq!(node.driver().power[channel], expected);
        }
    }

    #[test]
    fn malformed_payload_reported() {
        let mut node = node();
        assert_eq!(node.handle_message(b""), MessageOutcome::Malformed(ParseError::Empty));
        assert!(matches!(
            node.handle_message(br#"<lc id="#),
            MessageOutcome::Malformed(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn unrecognized_sys_is_ignored() {
        let mut node = node();
        assert_eq!(
            node.handle_message(br#"<sys cmd="status"/>"#),
            MessageOutcome::Ignored(SystemKind::Other("status".into()))
        );
        assert!(!node.state().override_active);
    }

    #[test]
    fn override_stop_calls_driver_stop() {
        let mut node = node();
        node.handle_message(br#"<lc id="t1" addr="42" dir="false" V="40" V_max="100"/>"#);
        for t in 0..5 {
            node.tick(t * 50).unwrap();
        }
        assert!(node.driver().power[0] < 0);

        node.handle_message(br#"<sys cmd="stop"/>"#);
        node.tick(300).unwrap();
        assert_eq!(node.driver().stop_calls, 1);
        assert_eq!(node.driver().power[0], 0);
        assert_eq!(node.state().current_speed, 0);
    }

    #[test]
    fn failed_power_retried() {
        let mut node = node();
        node.handle_message(br#"<lc id="t1" addr="42" dir="true" V="2" V_max="100"/>"#);
        node.driver_mut().fail = true;
        assert!(node.tick(0).is_err());

        node.driver_mut().fail = false;
        node.tick(10).unwrap();
        assert_eq!(node.driver().power[0], power_level(2, 100, node.driver().output_range()));
    }

    #[test]
    fn outputs_reconciled_while_motor_fails() {
        let mut node = node();
        node.driver_mut().fail_power = true;
        node.handle_message(br#"<fn id="t1" addr="42" fnchanged="5" fnchangedstate="true"/>"#);

        assert!(node.tick(0).is_err());
        assert!(node.driver().outputs[4]);
        assert!(node.state().actual[4]);

        node.handle_message(br#"<sys cmd="stop"/>"#);
        assert!(node.tick(500).is_err());
        assert_eq!(
            node.driver().outputs,
            [false, true, false, true, false, true, false, true]
        );

        assert!(node.tick(1000).is_err());
        assert_eq!(
            node.driver().outputs,
            [true, false, true, false, true, false, true, false]
        );
        assert_eq!(node.driver().power_calls, 0);
    }

    #[test]
    fn failed_override_stop_retried() {
        let mut node = node();
        node.handle_message(br#"<lc id="t1" addr="42" dir="true" V="10" V_max="100"/>"#);
        node.tick(0).unwrap();

        node.handle_message(br#"<sys cmd="ebreak"/>"#);
        node.driver_mut().fail_power = true;
        assert!(node.tick(50).is_err());
        assert_eq!(node.state().current_speed, 0);

        node.driver_mut().fail_power = false;
        node.tick(100).unwrap();
        assert_eq!(node.driver().power, [0, 0]);
    }

    #[test]
    fn state_snapshot() {
        let mut node = node();
        node.handle_message(br#"<fn id="t1" addr="42" fnchanged="3" fnchangedstate="true"/>"#);
        node.tick(0).unwrap();

        let state = node.state();
        assert_eq!(state.identity.get(), 42);
        assert!(state.desired[2]);
        assert!(state.actual[2]);
        assert!(!state.override_active);
    }
}
