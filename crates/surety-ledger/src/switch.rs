//! Operational switch - global pause gate
//!
//! Every mutating entry point calls [`OperationalSwitch::require_operational`]
//! before touching state. Only the administrator fixed at construction may
//! flip the switch, and flipping it works whether or not the system is paused.

use surety_common::{AccessError, AccountId, Result};
use tracing::info;

/// Pausable gate guarding all mutations
#[derive(Debug, Clone)]
pub struct OperationalSwitch {
    admin: AccountId,
    operational: bool,
}

impl OperationalSwitch {
    /// Create an open switch owned by `admin`
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            operational: true,
        }
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    #[inline]
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Fail with `SystemPaused` unless open
    #[inline]
    pub fn require_operational(&self) -> Result<()> {
        if self.operational {
            Ok(())
        } else {
            Err(AccessError::SystemPaused.into())
        }
    }

    /// Fail with `Unauthorized` unless `caller` is the administrator
    pub fn require_admin(&self, caller: &AccountId) -> Result<()> {
        if *caller == self.admin {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { caller: *caller }.into())
        }
    }

    /// Toggle the switch; returns whether the value changed
    pub fn set_operational(&mut self, caller: &AccountId, operational: bool) -> Result<bool> {
        self.require_admin(caller)?;
        let changed = self.operational != operational;
        self.operational = operational;
        if changed {
            info!(operational, "Operational status changed");
        }
        Ok(changed)
    }
}
