//! Node identity.
//!
//! Every node is named by an integer in `1..=65000`. The value is acquired
//! once at startup from non-volatile storage through an [`IdentityStore`];
//! on first boot a fresh value is generated and persisted.

use core::fmt;

/// Smallest valid identity.
pub const MIN_IDENTITY: u16 = 1;

/// Largest valid identity.
pub const MAX_IDENTITY: u16 = 65_000;

/// Errors acquiring an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Value outside `1..=65000`.
    #[error("identity {0} outside 1..=65000")]
    OutOfRange(u32),
    /// The backing store failed.
    #[error("identity store: {0}")]
    Store(alloc::string::String),
}

/// Persistent storage for the node identity.
pub trait IdentityStore {
    /// Error type for storage operations.
    type Error: fmt::Debug;

    /// Load the stored identity, `Ok(None)` if nothing is stored yet.
    fn load(&mut self) -> Result<Option<u16>, Self::Error>;

    /// Persist an identity.
    fn store(&mut self, id: u16) -> Result<(), Self::Error>;
}

/// The integer that authorizes which commands this node accepts.
///
/// Immutable once constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity(u16);

impl Identity {
    /// Validate and wrap an identity value.
    ///
    /// ```
    /// use rs_loconode::Identity;
    ///
    /// assert!(Identity::new(42).is_ok());
    /// assert!(Identity::new(0).is_err());
    /// assert!(Identity::new(65_001).is_err());
    /// ```
    pub fn new(value: u32) -> Result<Self, IdentityError> {
        if (MIN_IDENTITY as u32..=MAX_IDENTITY as u32).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(IdentityError::OutOfRange(value))
        }
    }

    /// Load the identity from `store`, generating and persisting one from
    /// `random` if none is stored or the stored value is invalid.
    pub fn acquire<S, R>(store: &mut S, random: R) -> Result<Self, IdentityError>
    where
        S: IdentityStore,
        R: FnOnce() -> u32,
    {
        let stored = store
            .load()
            .map_err(|e| IdentityError::Store(alloc::format!("{:?}", e)))?;

        if let Some(value) = stored {
            match Self::new(value as u32) {
                Ok(identity) => {
                    log::info!("Loaded identity {}", identity);
                    return Ok(identity);
                }
                Err(e) => log::warn!("Stored identity rejected: {}", e),
            }
        }

        let identity = Self::from_random(random());
        store
            .store(identity.get())
            .map_err(|e| IdentityError::Store(alloc::format!("{:?}", e)))?;
        log::info!("Generated new identity {}", identity);
        Ok(identity)
    }

    /// Fold an arbitrary random value into the valid range.
    pub fn from_random(raw: u32) -> Self {
        let span = (MAX_IDENTITY - MIN_IDENTITY) as u32 + 1;
        Self((raw % span) as u16 + MIN_IDENTITY)
    }

    /// The raw value.
    #[inline]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// True if a command address names this node.
    #[inline]
    pub fn matches(&self, address: i32) -> bool {
        address == self.0 as i32
    }

    /// Identity string used in outbound telemetry (`loco<N>`).
    pub fn label(&self) -> alloc::string::String {
        alloc::format!("loco{}", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
