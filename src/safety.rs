//! Safety override.
//!
//! A single flag that, while active, forces an immediate stop and an
//! alternating light pattern. It is engaged by `<sys cmd="stop|ebreak|shutdown"/>`
//! and released only by `<sys cmd="go"/>`; there is no timeout.
//!
//! Mutation is crate-private: only [`LocoNode`](crate::LocoNode) applying a
//! routed system command can change it. Everything else reads it.

use crate::commands::SystemKind;

/// The override flag plus the command that last engaged it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafetyOverride {
    engaged_by: Option<SystemKind>,
}

impl SafetyOverride {
    /// Inactive override.
    pub const fn new() -> Self {
        Self { engaged_by: None }
    }

    /// True while motion and lighting are overridden.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.engaged_by.is_some()
    }

    /// The system command that engaged the override, if active.
    pub fn engaged_by(&self) -> Option<&SystemKind> {
        self.engaged_by.as_ref()
    }

    /// Apply a system command. Returns true if the flag changed.
    pub(crate) fn apply(&mut self, kind: &SystemKind) -> bool {
        match kind.override_request() {
            Some(true) => {
                let changed = !self.is_active();
                if changed {
                    log::warn!("Safety override engaged by {:?}", kind);
                }
                self.engaged_by = Some(kind.clone());
                changed
            }
            Some(false) => {
                let changed = self.is_active();
                if changed {
                    log::info!("Safety override released");
                }
                self.engaged_by = None;
                changed
            }
            None => false,
        }
    }
}
