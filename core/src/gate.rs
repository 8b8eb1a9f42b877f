//! Process-wide operational switch.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{FlightSuretyError, Result};
use crate::types::Address;

/// On/off switch consulted by every mutating operation. Only the owner can
/// flip it.
#[derive(Debug)]
pub struct OperationalGate {
    owner: Address,
    operational: AtomicBool,
}

impl OperationalGate {
    /// New gate, initially open.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            operational: AtomicBool::new(true),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational.load(Ordering::SeqCst)
    }

    pub fn require_operational(&self) -> Result<()> {
        if self.is_operational() {
            Ok(())
        } else {
            Err(FlightSuretyError::OperationNotAllowed)
        }
    }

    /// Set the flag. Returns whether the value changed; setting the current
    /// value is a no-op.
    pub fn set_operating_status(&self, caller: &Address, operational: bool) -> Result<bool> {
        if caller != &self.owner {
            return Err(FlightSuretyError::Unauthorized {
                caller: caller.clone(),
            });
        }

        let previous = self.operational.swap(operational, Ordering::SeqCst);
        if previous != operational {
            tracing::info!(operational, "operating status changed");
        }
        Ok(previous != operational)
    }
}
