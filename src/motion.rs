//! Motion controller.
//!
//! Holds the current, target and maximum speed of the locomotive and moves
//! the current speed toward the target in bounded steps:
//!
//! 1. Override active and moving: snap to 0.
//! 2. At target: nothing.
//! 3. Target 0: snap to 0. Stopping is never gradual.
//! 4. Otherwise, at most once per `ramp_interval_ms`, step toward the
//!    target. Speeding up in the same direction uses `accel_step`; slowing
//!    down or reversing uses the larger `brake_step`. Steps never overshoot.
//!
//! Speeds are signed (positive = forward) in the percentage scale of the
//! last loco command's `V_max`.

use crate::commands::LocoCommand;
use crate::config::MotionConfig;
use crate::lights::{light_event, LightEvent};
use crate::traits::OutputRange;

/// Speed state of the locomotive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionState {
    /// Applied speed, sign is direction.
    pub current: i32,
    /// Commanded speed.
    pub target: i32,
    /// Speed scale, 0 until the first loco command.
    pub max: i32,
}

/// Why a step changed the speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Safety override snap to zero.
    OverrideStop,
    /// Zero-target snap.
    Halt,
    /// Same-direction speed-up.
    Accelerate,
    /// Slow-down or reversal.
    Brake,
}

/// A speed change produced by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionStep {
    /// Speed before the step.
    pub previous: i32,
    /// Speed after the step.
    pub current: i32,
    /// What kind of step it was.
    pub kind: StepKind,
    /// Light transition, if the sign changed.
    pub light_event: Option<LightEvent>,
}

/// Ramping state machine for one locomotive.
#[derive(Clone, Debug)]
pub struct MotionController {
    state: MotionState,
    config: MotionConfig,
    last_step_ms: Option<u64>,
}

impl MotionController {
    /// Stationary controller with no speed scale yet.
    pub fn new(config: MotionConfig) -> Self {
        Self {
            state: MotionState::default(),
            config,
            last_step_ms: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Applied speed.
    #[inline]
    pub fn current(&self) -> i32 {
        self.state.current
    }

    /// Commanded speed.
    #[inline]
    pub fn target(&self) -> i32 {
        self.state.target
    }

    /// Speed scale.
    #[inline]
    pub fn max(&self) -> i32 {
        self.state.max
    }

    /// True once current speed equals target.
    pub fn is_settled(&self) -> bool {
        self.state.current == self.state.target
    }

    /// Take a new target and scale from an accepted loco command.
    ///
    /// If the new scale is below the current magnitude, the current speed is
    /// clamped to it right away. Returns true in that case.
    ///
    /// A negative scale is treated as 0, so the target and current speed
    /// both become 0.
    pub fn set_target(&mut self, cmd: &LocoCommand) -> bool {
        let limit = cmd.max_velocity.max(0);
        self.state.max = limit;
        self.state.target = cmd.target_speed().clamp(-limit, limit);

        let clamped = self.state.current.clamp(-limit, limit);
        let changed = clamped != self.state.current;
        self.state.current = clamped;
        changed
    }

    /// Advance one control tick.
    ///
    /// Returns the step taken, or `None` if the speed did not change.
    pub fn tick(&mut self, now_ms: u64, override_active: bool) -> Option<MotionStep> {
        let current = self.state.current;
        let target = self.state.target;

        let (next, kind) = if override_active {
            if current == 0 {
                return None;
            }
            (0, StepKind::OverrideStop)
        } else if current == target {
            return None;
        } else if target == 0 {
            (0, StepKind::Halt)
        } else {
            if !self.interval_elapsed(now_ms) {
                return None;
            }
            self.last_step_ms = Some(now_ms);
            let (next, accelerating) = ramp_step(current, target, &self.config);
            let kind = if accelerating {
                StepKind::Accelerate
            } else {
                StepKind::Brake
            };
            (next, kind)
        };

        let step = MotionStep {
            previous: current,
            current: next,
            kind,
            light_event: light_event(current, next),
        };
        self.state.current = next;
        Some(step)
    }

    fn interval_elapsed(&self, now_ms: u64) -> bool {
        match self.last_step_ms {
            None => true,
            Some(last) => {
                now_ms.saturating_sub(last) >= u64::from(self.config.ramp_interval_ms)
            }
        }
    }
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

/// True when moving from `current` to `target` speeds up in the same direction.
///
/// Zero counts as either direction.
#[inline]
pub fn is_acceleration(current: i32, target: i32) -> bool {
    current.unsigned_abs() < target.unsigned_abs() && current.signum() * target.signum() >= 0
}

/// One bounded step from `current` toward `target`.
///
/// Returns the new speed and whether it was an acceleration step.
pub fn ramp_step(current: i32, target: i32, config: &MotionConfig) -> (i32, bool) {
    let accelerating = is_acceleration(current, target);
    let step = if accelerating {
        config.accel_step
    } else {
        config.brake_step
    }
    .max(1);

    let next = if target > current {
        current.saturating_add(step).min(target)
    } else {
        current.saturating_sub(step).max(target)
    };
    (next, accelerating)
}

/// Map a signed speed onto a driver's native range.
///
/// `[-max_speed, max_speed]` maps linearly onto `[range.min, range.max]`,
/// with 0 on the midpoint. A zero or negative scale always yields the
/// midpoint.
///
/// ```rust
/// use rs_loconode::motion::power_level;
/// use rs_loconode::traits::OutputRange;
///
/// let range = OutputRange::symmetric(1000);
/// assert_eq!(power_level(50, 100, range), 500);
/// assert_eq!(power_level(-100, 100, range), -1000);
/// assert_eq!(power_level(0, 100, range), 0);
/// ```
pub fn power_level(speed: i32, max_speed: i32, range: OutputRange) -> i32 {
    let mid = range.midpoint();
    if max_speed <= 0 || speed == 0 {
        return mid;
    }
    let speed = i64::from(speed.clamp(-max_speed, max_speed));
    let max_speed = i64::from(max_speed);
    let span = if speed > 0 {
        i64::from(range.max) - i64::from(mid)
    } else {
        i64::from(mid) - i64::from(range.min)
    };
    let offset = speed * span / max_speed;
    range.clamp((i64::from(mid) + offset) as i32)
}
