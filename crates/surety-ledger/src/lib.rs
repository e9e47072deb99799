//! # Surety Ledger
//!
//! Owned state of the FlightSurety engine: everything except the oracle
//! network.
//!
//! ## Components
//!
//! - **Switch**: administrator-controlled pause gate checked by every mutation
//! - **Registry**: airline admission, bootstrap fast path then ≥50% quorum
//! - **Insurance**: flights, passenger policies, crediting and claims
//! - **Treasury**: stakes, premiums and fees held, payouts reserved and paid
//! - **Chain**: height and hash of committed calls
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      SuretyLedger                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌────────────┐  ┌───────────┐  ┌────────┐ │
//! │  │  Switch  │──│  Registry  │──│ Insurance │──│Treasury│ │
//! │  └──────────┘  └────────────┘  └───────────┘  └────────┘ │
//! └──────────────────────────────────────────────────────────┘
//!                                        │ withdraw
//!                                  ┌─────────────┐
//!                                  │ PayoutRail  │
//!                                  └─────────────┘
//! ```

pub mod chain;
pub mod data;
pub mod insurance;
pub mod payout;
pub mod registry;
pub mod switch;
pub mod treasury;

pub use chain::ChainHead;
pub use data::SuretyLedger;
pub use insurance::{Claim, CreditSummary, InsuranceLedger};
pub use payout::{PayoutRail, SharedRail, TransferError};
pub use registry::{AirlineRegistry, RegistrationOutcome};
pub use switch::OperationalSwitch;
pub use treasury::{DepositSource, Treasury, TreasuryError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surety_common::{Result, SuretyError};

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Exact stake an airline posts to become Funded
    pub airline_stake: Decimal,
    /// Maximum premium per policy
    pub premium_cap: Decimal,
    /// Payout as a percentage of premium (150 = 1.5x)
    pub payout_multiplier_percent: u32,
    /// Registered airlines below which no quorum is needed
    pub bootstrap_airline_count: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            airline_stake: surety_common::AIRLINE_STAKE,
            premium_cap: surety_common::PREMIUM_CAP,
            payout_multiplier_percent: surety_common::PAYOUT_MULTIPLIER_PERCENT,
            bootstrap_airline_count: surety_common::BOOTSTRAP_AIRLINE_COUNT,
        }
    }
}

impl LedgerConfig {
    /// Reject settings the ledger cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.airline_stake <= Decimal::ZERO {
            return Err(SuretyError::Config("airline_stake must be positive".into()));
        }
        if self.premium_cap <= Decimal::ZERO {
            return Err(SuretyError::Config("premium_cap must be positive".into()));
        }
        if self.payout_multiplier_percent < 100 {
            return Err(SuretyError::Config(
                "payout_multiplier_percent must be at least 100".into(),
            ));
        }
        if self.bootstrap_airline_count == 0 {
            return Err(SuretyError::Config(
                "bootstrap_airline_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.airline_stake, dec!(10));
        assert_eq!(config.premium_cap, dec!(1));
        assert_eq!(config.payout_multiplier_percent, 150);
    }

    #[test]
    fn test_invalid_config() {
        let config = LedgerConfig {
            payout_multiplier_percent: 50,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SuretyError::Config(_))));

        let config = LedgerConfig {
            premium_cap: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
