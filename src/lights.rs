//! Function/light controller.
//!
//! Each function output has a *desired* bit, set by `<fn/>` commands or by a
//! light event derived from motion, and an *actual* bit, the last value sent
//! to the driver. [`FunctionController::reconcile`] drives actual toward
//! desired once per tick. While the safety override is active the outputs
//! blink in an alternating pattern instead and desired is left untouched, so
//! the commanded lighting comes back as soon as the override is released.
//!
//! # Light events
//!
//! | Event | Outputs 0..3 |
//! |-------|--------------|
//! | [`LightEvent::ForwardStarted`] | on, off, off |
//! | [`LightEvent::ReverseStarted`] | on, on, on |
//! | [`LightEvent::Stop`] | unchanged |

use crate::config::{LightConfig, FUNCTION_COUNT};
use crate::traits::ActuationDriver;

/// Number of leading outputs a light event rewrites.
pub const LIGHT_OUTPUTS: usize = 3;

/// Lighting transition derived from a change in speed sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightEvent {
    /// Speed became zero from nonzero.
    Stop,
    /// Speed became positive from zero or negative.
    ForwardStarted,
    /// Speed became negative from zero or positive.
    ReverseStarted,
}

impl LightEvent {
    /// Pattern over the first [`LIGHT_OUTPUTS`] outputs, `None` if the event
    /// leaves them alone.
    pub fn pattern(self) -> Option<[bool; LIGHT_OUTPUTS]> {
        match self {
            LightEvent::Stop => None,
            LightEvent::ForwardStarted => Some([true, false, false]),
            LightEvent::ReverseStarted => Some([true, true, true]),
        }
    }
}

/// Light event for a speed change from `prev` to `new`.
///
/// Only the signs matter. Returns `None` when the sign is unchanged.
///
/// ```rust
/// use rs_loconode::lights::{light_event, LightEvent};
///
/// assert_eq!(light_event(0, 2), Some(LightEvent::ForwardStarted));
/// assert_eq!(light_event(4, 6), None);
/// assert_eq!(light_event(5, -3), Some(LightEvent::ReverseStarted));
/// assert_eq!(light_event(-3, 0), Some(LightEvent::Stop));
/// ```
pub fn light_event(prev: i32, new: i32) -> Option<LightEvent> {
    let (before, after) = (prev.signum(), new.signum());
    if before == after {
        return None;
    }
    Some(match after {
        1 => LightEvent::ForwardStarted,
        -1 => LightEvent::ReverseStarted,
        _ => LightEvent::Stop,
    })
}

/// Whether output `index` is lit in the override blink pattern at `now_ms`.
///
/// Neighbouring outputs are always in opposite phase.
#[inline]
pub fn blink_phase(now_ms: u64, period_ms: u32, index: usize) -> bool {
    let bucket = now_ms / u64::from(period_ms.max(1));
    (bucket + index as u64) % 2 == 0
}

/// Desired and applied state of every function output.
#[derive(Clone, Debug)]
pub struct FunctionController {
    desired: [bool; FUNCTION_COUNT],
    actual: [bool; FUNCTION_COUNT],
    blink_period_ms: u32,
}

impl FunctionController {
    /// All outputs off, both desired and applied.
    pub fn new(config: LightConfig) -> Self {
        Self {
            desired: [false; FUNCTION_COUNT],
            actual: [false; FUNCTION_COUNT],
            blink_period_ms: config.blink_period_ms.max(1),
        }
    }

    /// Number of outputs.
    pub const fn count(&self) -> usize {
        FUNCTION_COUNT
    }

    /// Desired states.
    pub fn desired(&self) -> &[bool; FUNCTION_COUNT] {
        &self.desired
    }

    /// Last applied states.
    pub fn actual(&self) -> &[bool; FUNCTION_COUNT] {
        &self.actual
    }

    /// Set one desired bit. Out-of-range indices are ignored.
    pub fn set_desired(&mut self, index: usize, on: bool) {
        if let Some(slot) = self.desired.get_mut(index) {
            *slot = on;
        }
    }

    /// Apply a light event to the desired bits.
    pub fn apply_light_event(&mut self, event: LightEvent) {
        if let Some(pattern) = event.pattern() {
            self.desired[..LIGHT_OUTPUTS].copy_from_slice(&pattern);
        }
    }

    /// Drive applied state toward desired (or the blink pattern).
    ///
    /// Only outputs whose state differs are sent to the driver. Returns the
    /// number of outputs switched. On a driver error the failing output keeps
    /// its old applied state and the remaining outputs are retried next tick.
    pub fn reconcile<D: ActuationDriver>(
        &mut self,
        now_ms: u64,
        override_active: bool,
        driver: &mut D,
    ) -> Result<usize, D::Error> {
        let mut switched = 0;
        for index in 0..FUNCTION_COUNT {
            let on = if override_active {
                blink_phase(now_ms, self.blink_period_ms, index)
            } else {
                self.desired[index]
            };
            if on != self.actual[index] {
                driver.set_output(index, on)?;
                self.actual[index] = on;
                switched += 1;
            }
        }
        Ok(switched)
    }
}

impl Default for FunctionController {
    fn default() -> Self {
        Self::new(LightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockDriver;

    #[test]
    fn events_from_sign_changes() {
        assert_eq!(light_event(0, 1), Some(LightEvent::ForwardStarted));
        assert_eq!(light_event(-4, 3), Some(LightEvent::ForwardStarted));
        assert_eq!(light_event(0, -1), Some(LightEvent::ReverseStarted));
        assert_eq!(light_event(7, -2), Some(LightEvent::ReverseStarted));
        assert_eq!(light_event(9, 0), Some(LightEvent::Stop));
        assert_eq!(light_event(-9, 0), Some(LightEvent::Stop));
    }

    #[test]
    fn no_event_without_sign_change() {
        assert_eq!(light_event(0, 0), None);
        assert_eq!(light_event(2, 50), None);
        assert_eq!(light_event(-50, -5), None);
    }

    #[test]
    fn forward_pattern() {
        let mut lights = FunctionController::default();
        lights.set_desired(1, true);
        lights.apply_light_event(LightEvent::ForwardStarted);
        assert_eq!(&lights.desired()[..3], &[true, false, false]);
    }

    #[test]
    fn reverse_pattern() {
        let mut lights = FunctionController::default();
        lights.apply_light_event(LightEvent::ReverseStarted);
        assert_eq!(&lights.desired()[..3], &[true, true, true]);
    }

    #[test]
    fn stop_event_leaves_outputs() {
        let mut lights = FunctionController::default();
        lights.apply_light_event(LightEvent::ReverseStarted);
        lights.apply_light_event(LightEvent::Stop);
        assert_eq!(&lights.desired()[..3], &[true, true, true]);
    }

    #[test]
    fn events_do_not_touch_higher_outputs() {
        let mut lights = FunctionController::default();
        lights.set_desired(5, true);
        lights.apply_light_event(LightEvent::ForwardStarted);
        lights.apply_light_event(LightEvent::ReverseStarted);
        assert!(lights.desired()[5]);
        assert!(!lights.desired()[3]);
    }

    #[test]
    fn set_desired_out_of_range_ignored() {
        let mut lights = FunctionController::default();
        lights.set_desired(FUNCTION_COUNT, true);
        assert!(lights.desired().iter().all(|on| !on));
    }

    #[test]
    fn reconcile_switches_only_changed_outputs() {
        let mut lights = FunctionController::default();
        let mut driver = MockDriver::new();

        lights.set_desired(0, true);
        lights.set_desired(4, true);
        assert_eq!(lights.reconcile(0, false, &mut driver).unwrap(), 2);
        assert!(driver.outputs[0]);
        assert!(driver.outputs[4]);
        assert_eq!(driver.output_calls, 2);

        // Converged: nothing more to send
        assert_eq!(lights.reconcile(10, false, &mut driver).unwrap(), 0);
        assert_eq!(driver.output_calls, 2);
        assert_eq!(lights.actual(), lights.desired());
    }

    #[test]
    fn blink_phase_alternates() {
        assert!(blink_phase(0, 500, 0));
        assert!(!blink_phase(0, 500, 1));
        assert!(!blink_phase(499, 500, 0));
        assert!(!blink_phase(500, 500, 0));
        assert!(blink_phase(500, 500, 1));
        assert!(blink_phase(1000, 500, 0));
    }

    #[test]
    fn override_blinks_and_ignores_desired() {
        let mut lights = FunctionController::default();
        let mut driver = MockDriver::new();
        lights.set_desired(0, true);
        lights.set_desired(1, true);

        lights.reconcile(0, true, &mut driver).unwrap();
        for i in 0..FUNCTION_COUNT {
            assert_eq!(lights.actual()[i], i % 2 == 0);
        }

        lights.reconcile(500, true, &mut driver).unwrap();
        for i in 0..FUNCTION_COUNT {
            assert_eq!(lights.actual()[i], i % 2 == 1);
        }

        // Desired untouched by blinking
        assert!(lights.desired()[0] && lights.desired()[1]);
        assert!(!lights.desired()[2]);
    }

    #[test]
    fn release_restores_desired() {
        let mut lights = FunctionController::default();
        let mut driver = MockDriver::new();
        lights.set_desired(1, true);

        lights.reconcile(0, true, &mut driver).unwrap();
        lights.reconcile(20, false, &mut driver).unwrap();
        assert_eq!(lights.actual(), lights.desired());
        assert!(driver.outputs[1]);
        assert!(!driver.outputs[0]);
    }

    #[test]
    fn failed_output_retried_next_tick() {
        let mut lights = FunctionController::default();
        let mut driver = MockDriver::new();
        lights.set_desired(2, true);

        driver.fail = true;
        assert!(lights.reconcile(0, false, &mut driver).is_err());
        assert!(!lights.actual()[2]);

        driver.fail = false;
        assert_eq!(lights.reconcile(10, false, &mut driver).unwrap(), 1);
        assert!(lights.actual()[2]);
    }
}
