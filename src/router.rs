//! Command routing and validation.
//!
//! [`CommandRouter`] classifies a parsed [`Document`] by its top-level
//! element and validates the attributes for that kind:
//!
//! | Element | Required attributes | Addressed |
//! |---------|--------------------|-----------|
//! | `lc` | `id`, `addr`, `dir`, `V`, `V_max` | yes |
//! | `fn` | `id`, `addr`, `fnchanged`, `fnchangedstate` | yes |
//! | `sys` | `cmd` | no |
//!
//! Routing is pure: it never touches node state. Any failure yields a
//! [`RejectReason`] and the caller discards the message.
//!
//! # Example
//!
//! ```rust
//! use rs_loconode::{Command, CommandRouter, Direction, Identity};
//! use rs_loconode::parsing::Document;
//!
//! let router = CommandRouter::new(Identity::new(42).unwrap(), 8);
//! let doc = Document::parse(r#"<lc id="t1" addr="42" dir="false" V="20" V_max="100"/>"#).unwrap();
//!
//! match router.route(&doc).unwrap() {
//!     Command::Loco(lc) => {
//!         assert_eq!(lc.direction, Direction::Reverse);
//!         assert_eq!(lc.target_speed(), -20);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use alloc::string::ToString;

use crate::commands::{
    parse_flag, Command, Direction, FunctionCommand, LocoCommand, RejectReason, SystemCommand,
    SystemKind,
};
use crate::identity::Identity;
use crate::parsing::{AttributeError, Document, Element};

/// Element name of a loco command.
pub const LOCO: &str = "lc";
/// Element name of a function command.
pub const FUNCTION: &str = "fn";
/// Element name of a system command.
pub const SYSTEM: &str = "sys";

/// Turns parsed documents into commands for one node.
#[derive(Clone, Copy, Debug)]
pub struct CommandRouter {
    identity: Identity,
    function_count: usize,
}

impl CommandRouter {
    /// Router for `identity` with `function_count` function outputs.
    pub fn new(identity: Identity, function_count: usize) -> Self {
        Self {
            identity,
            function_count,
        }
    }

    /// The identity commands must be addressed to.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Classify and validate a document.
    pub fn route(&self, doc: &Document) -> Result<Command, RejectReason> {
        if let Some(lc) = doc.top_level(LOCO) {
            self.route_loco(lc).map(Command::Loco)
        } else if let Some(f) = doc.top_level(FUNCTION) {
            self.route_function(f).map(Command::Function)
        } else if let Some(sys) = doc.top_level(SYSTEM) {
            route_system(sys).map(Command::System)
        } else {
            Err(RejectReason::UnknownKind(doc.root().name().to_string()))
        }
    }

    fn route_loco(&self, el: &Element) -> Result<LocoCommand, RejectReason> {
        let (id, address) = self.authorize(el, LOCO)?;

        let dir = el.str_attribute("dir").map_err(attr(LOCO))?;
        let direction = Direction::from_flag(dir).ok_or_else(|| RejectReason::InvalidFlag {
            name: "dir",
            value: dir.to_string(),
        })?;

        let velocity = el.int_attribute("V").map_err(attr(LOCO))?;
        if velocity < 0 {
            return Err(RejectReason::NegativeVelocity(velocity));
        }

        let max_velocity = el.int_attribute("V_max").map_err(attr(LOCO))?;
        if max_velocity <= 0 {
            return Err(RejectReason::InvalidVelocityScale(max_velocity));
        }

        Ok(LocoCommand {
            id,
            address,
            direction,
            velocity,
            max_velocity,
        })
    }

    fn route_function(&self, el: &Element) -> Result<FunctionCommand, RejectReason> {
        let (id, address) = self.authorize(el, FUNCTION)?;

        let index = el.int_attribute("fnchanged").map_err(attr(FUNCTION))?;
        if index < 1 || index as usize > self.function_count {
            return Err(RejectReason::FunctionOutOfRange {
                index,
                count: self.function_count,
            });
        }

        let raw_state = el.str_attribute("fnchangedstate").map_err(attr(FUNCTION))?;
        let state = parse_flag(raw_state).ok_or_else(|| RejectReason::InvalidFlag {
            name: "fnchangedstate",
            value: raw_state.to_string(),
        })?;

        Ok(FunctionCommand {
            id,
            address,
            index: index as usize - 1,
            state,
        })
    }

    /// Check `id` and `addr` and that the command is for this node.
    fn authorize(
        &self,
        el: &Element,
        kind: &'static str,
    ) -> Result<(alloc::string::String, i32), RejectReason> {
        let id = el.str_attribute("id").map_err(attr(kind))?;
        let address = el.int_attribute("addr").map_err(attr(kind))?;

        if !self.identity.matches(address) {
            return Err(RejectReason::AddressMismatch {
                address,
                identity: self.identity.get(),
            });
        }

        Ok((id.to_string(), address))
    }
}

fn route_system(el: &Element) -> Result<SystemCommand, RejectReason> {
    let cmd = el.str_attribute("cmd").map_err(attr(SYSTEM))?;
    Ok(SystemCommand {
        kind: SystemKind::from_cmd(cmd),
    })
}

fn attr(kind: &'static str) -> impl Fn(AttributeError) -> RejectReason {
    move |source| RejectReason::Attribute { kind, source }
}
