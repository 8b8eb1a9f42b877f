//! Fixed protocol parameters.

use serde::{Deserialize, Serialize};

use crate::error::{FlightSuretyError, Result};

/// One ether in wei.
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Default quorum of matching oracle responses.
pub const MIN_RESPONSES: usize = 3;

/// Funded airlines that may admit new airlines on their own.
pub const BOOTSTRAP_AIRLINES: u32 = 4;

/// Oracle indexes are drawn from `[0, INDEX_RANGE)`.
pub const INDEX_RANGE: u8 = 10;

/// Indexes assigned to every oracle node.
pub const INDEXES_PER_ORACLE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Minimum deposit for an airline to become Funded.
    pub minimum_fund: u128,
    /// Minimum stake for an oracle node registration.
    pub minimum_oracle_stake: u128,
    pub index_range: u8,
    pub min_responses: usize,
    pub bootstrap_airlines: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            minimum_fund: ONE_ETHER,
            minimum_oracle_stake: ONE_ETHER,
            index_range: INDEX_RANGE,
            min_responses: MIN_RESPONSES,
            bootstrap_airlines: BOOTSTRAP_AIRLINES,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if self.index_range == 0 {
            return Err(FlightSuretyError::InvalidParameters(
                "index_range must be at least 1".to_string(),
            ));
        }
        if self.min_responses == 0 {
            return Err(FlightSuretyError::InvalidParameters(
                "min_responses must be at least 1".to_string(),
            ));
        }
        if self.bootstrap_airlines == 0 {
            return Err(FlightSuretyError::InvalidParameters(
                "bootstrap_airlines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
