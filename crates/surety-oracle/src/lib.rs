//! # Surety Oracle
//!
//! Off-ledger flight status consensus.
//!
//! Oracles register against a fee and receive three indexes. A status
//! request for a flight carries one index; only oracles holding it may
//! answer, and the first status code reported by `min_responses` of them
//! becomes the flight's status.

pub mod consensus;
pub mod request;
pub mod sampler;

pub use consensus::{OracleConsensus, OracleRecord, ResponseOutcome};
pub use request::{ReportOutcome, RequestKey, StatusRequest};
pub use sampler::IndexSampler;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use surety_common::{Result, SuretyError};

/// Oracle network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Minimum fee attached to registration
    pub registration_fee: Decimal,
    /// Indexes assigned per oracle
    pub index_count: usize,
    /// Indexes are drawn from `0..index_space`
    pub index_space: u8,
    /// Matching responses that resolve a request
    pub min_responses: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            registration_fee: surety_common::ORACLE_REGISTRATION_FEE,
            index_count: surety_common::ORACLE_INDEX_COUNT,
            index_space: surety_common::ORACLE_INDEX_SPACE,
            min_responses: surety_common::MIN_ORACLE_RESPONSES,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.registration_fee <= Decimal::ZERO {
            return Err(SuretyError::Config(
                "registration_fee must be positive".into(),
            ));
        }
        if self.index_space == 0 {
            return Err(SuretyError::Config("index_space must be positive".into()));
        }
        if self.index_count == 0 || self.index_count > usize::from(self.index_space) {
            return Err(SuretyError::Config(format!(
                "index_count must lie in 1..={}",
                self.index_space
            )));
        }
        if self.min_responses == 0 {
            return Err(SuretyError::Config(
                "min_responses must be at least 1".into(),
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
    fn test_default_config() {
        let config = OracleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registration_fee, dec!(1));
        assert_eq!(config.index_count, 3);
        assert_eq!(config.index_space, 10);
        assert_eq!(config.min_responses, 3);
    }

    #[test]
    fn test_index_count_bounded_by_space() {
        let config = OracleConfig {
            index_count: 11,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SuretyError::Config(_))));
    }
}
