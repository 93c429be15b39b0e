//! Command types produced by the router and consumed by the node.
//!
//! # Command Flow
//!
//! 1. A raw payload is parsed into a [`Document`](crate::parsing::Document)
//! 2. The [`CommandRouter`](crate::router::CommandRouter) classifies it into a [`Command`]
//!    or a [`RejectReason`]
//! 3. [`LocoNode`](crate::LocoNode) applies the command to its motion, function or
//!    override state and reports a [`MessageOutcome`]
//!
//! Commands are transient: they are created per inbound message and consumed
//! immediately.

extern crate alloc;

use alloc::string::String;

use crate::parsing::{AttributeError, ParseError};

// ============================================================================
// Direction
// ============================================================================

/// Requested direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Positive speed.
    Forward,
    /// Negative speed.
    Reverse,
}

impl Direction {
    /// Parse the `dir` flag vocabulary: exactly `"true"` or `"false"`.
    ///
    /// ```
    /// use rs_loconode::Direction;
    ///
    /// assert_eq!(Direction::from_flag("true"), Some(Direction::Forward));
    /// assert_eq!(Direction::from_flag("false"), Some(Direction::Reverse));
    /// assert_eq!(Direction::from_flag("TRUE"), None);
    /// ```
    pub fn from_flag(s: &str) -> Option<Self> {
        parse_flag(s).map(|forward| {
            if forward {
                Direction::Forward
            } else {
                Direction::Reverse
            }
        })
    }

    /// `+1` for forward, `-1` for reverse.
    #[inline]
    pub const fn sign(&self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// Lowercase name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

/// Parse the boolean vocabulary shared by `dir` and `fnchangedstate`.
pub fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Kind of system command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemKind {
    /// `ebreak` - emergency brake.
    EmergencyBrake,
    /// `stop`
    Stop,
    /// `shutdown`
    Shutdown,
    /// `go` - releases the safety override.
    Go,
    /// Any other `cmd` value. Recognized but has no effect.
    Other(String),
}

impl SystemKind {
    /// Map a `cmd` attribute value to a kind.
    pub fn from_cmd(cmd: &str) -> Self {
        match cmd {
            "ebreak" => SystemKind::EmergencyBrake,
            "stop" => SystemKind::Stop,
            "shutdown" => SystemKind::Shutdown,
            "go" => SystemKind::Go,
            other => SystemKind::Other(other.into()),
        }
    }

    /// Desired override state: `Some(true)` engages, `Some(false)` releases,
    /// `None` leaves it alone.
    pub fn override_request(&self) -> Option<bool> {
        match self {
            SystemKind::EmergencyBrake | SystemKind::Stop | SystemKind::Shutdown => Some(true),
            SystemKind::Go => Some(false),
            SystemKind::Other(_) => None,
        }
    }
}

/// Target velocity for the addressed locomotive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocoCommand {
    /// Informational sender id, used only in logs.
    pub id: String,
    /// Address the command was sent to.
    pub address: i32,
    /// Requested direction.
    pub direction: Direction,
    /// Requested velocity magnitude (non-negative).
    pub velocity: i32,
    /// Velocity scale (positive).
    pub max_velocity: i32,
}

impl LocoCommand {
    /// Signed target speed, clamped to the velocity scale.
    pub fn target_speed(&self) -> i32 {
        self.velocity.min(self.max_velocity) * self.direction.sign()
    }
}

/// Sets one function output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionCommand {
    /// Informational sender id, used only in logs.
    pub id: String,
    /// Address the command was sent to.
    pub address: i32,
    /// Zero-based function output index.
    pub index: usize,
    /// Desired output state.
    pub state: bool,
}

/// Controls the safety override.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemCommand {
    /// What was requested.
    pub kind: SystemKind,
}

/// A routed, validated command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `<lc .../>`
    Loco(LocoCommand),
    /// `<fn .../>`
    Function(FunctionCommand),
    /// `<sys .../>`
    System(SystemCommand),
}

impl Command {
    /// Short element name of the command kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Command::Loco(_) => "lc",
            Command::Function(_) => "fn",
            Command::System(_) => "sys",
        }
    }
}

// ============================================================================
// Rejections and outcomes
// ============================================================================

/// Why a well-formed message was not turned into a command.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Top-level element is not `lc`, `fn` or `sys`.
    #[error("message kind unrecognized: <{0}>")]
    UnknownKind(String),
    /// A required attribute is missing or mistyped.
    #[error("<{kind}>: {source}")]
    Attribute {
        /// Element kind.
        kind: &'static str,
        /// Underlying attribute failure.
        source: AttributeError,
    },
    /// Command addressed to another node.
    #[error("address {address} does not match identity {identity}")]
    AddressMismatch {
        /// Address carried by the command.
        address: i32,
        /// This node's identity.
        identity: u16,
    },
    /// `dir` or `fnchangedstate` was not `"true"`/`"false"`.
    #[error("attribute `{name}` must be \"true\" or \"false\", got {value:?}")]
    InvalidFlag {
        /// Attribute name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// `V` was negative.
    #[error("velocity must not be negative, got {0}")]
    NegativeVelocity(i32),
    /// `V_max` was zero or negative.
    #[error("velocity scale must be positive, got {0}")]
    InvalidVelocityScale(i32),
    /// `fnchanged` outside `1..=count`.
    #[error("function index {index} outside 1..={count}")]
    FunctionOutOfRange {
        /// One-based index as received.
        index: i32,
        /// Number of function outputs.
        count: usize,
    },
}

/// Result of handling one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Command accepted and applied to node state.
    Applied(Command),
    /// Recognized `sys` command with no effect.
    Ignored(SystemKind),
    /// Well-formed but rejected; state unchanged.
    Rejected(RejectReason),
    /// Payload failed structural parsing; state unchanged.
    Malformed(ParseError),
}

impl MessageOutcome {
    /// True if node state was mutated.
    pub fn is_applied(&self) -> bool {
        matches!(self, MessageOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Reverse.sign(), -1);
    }

    #[test]
    fn flag_vocabulary_is_exact() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("True"), None);
        assert_eq!(parse_flag("1"), None);
        assert_eq!(parse_flag(" true"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn system_kind_mapping() {
        assert_eq!(SystemKind::from_cmd("ebreak"), SystemKind::EmergencyBrake);
        assert_eq!(SystemKind::from_cmd("stop"), SystemKind::Stop);
        assert_eq!(SystemKind::from_cmd("shutdown"), SystemKind::Shutdown);
        assert_eq!(SystemKind::from_cmd("go"), SystemKind::Go);
        assert_eq!(
            SystemKind::from_cmd("reset"),
            SystemKind::Other("reset".into())
        );
    }

    #[test]
    fn override_requests() {
        assert_eq!(SystemKind::Stop.override_request(), Some(true));
        assert_eq!(SystemKind::EmergencyBrake.override_request(), Some(true));
        assert_eq!(SystemKind::Shutdown.override_request(), Some(true));
        assert_eq!(SystemKind::Go.override_request(), Some(false));
        assert_eq!(SystemKind::Other("x".into()).override_request(), None);
    }

    #[test]
    fn loco_target_speed_signed_and_clamped() {
        let mut cmd = LocoCommand {
            id: "t1".into(),
            address: 42,
            direction: Direction::Reverse,
            velocity: 50,
            max_velocity: 100,
        };
        assert_eq!(cmd.target_speed(), -50);

        cmd.direction = Direction::Forward;
        cmd.velocity = 150;
        assert_eq!(cmd.target_speed(), 100);
    }

    #[test]
    fn reject_reason_display() {
        let reason = RejectReason::AddressMismatch {
            address: 7,
            identity: 42,
        };
        assert_eq!(
            reason.to_string(),
            "address 7 does not match identity 42"
        );
    }
}
