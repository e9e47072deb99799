//! Treasury - native-currency funds held by the ledger
//!
//! Key characteristics:
//! - Deposits are tracked per source (airline stakes, premiums, oracle fees)
//! - Credited-but-unpaid payouts are reserved as `owed`
//! - Disbursements can be reversed when the external transfer fails
//! - Version field bumps on every mutation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Treasury operation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreasuryError {
    #[error("Insufficient treasury balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient owed balance: required {required}, owed {owed}")]
    InsufficientOwed { required: Decimal, owed: Decimal },

    #[error("Amount must be positive")]
    InvalidAmount,
}

/// Source of an incoming deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositSource {
    AirlineStake,
    Premium,
    OracleFee,
}

/// Funds held by the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Treasury {
    /// Airline stakes received
    pub stakes: Decimal,

    /// Insurance premiums received
    pub premiums: Decimal,

    /// Oracle registration fees received
    pub oracle_fees: Decimal,

    /// Payouts transferred to passengers
    pub paid_out: Decimal,

    /// Credited payouts not yet withdrawn
    pub owed: Decimal,

    /// Mutation counter
    pub version: u64,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total funds currently held
    #[inline]
    pub fn balance(&self) -> Decimal {
        self.stakes + self.premiums + self.oracle_fees - self.paid_out
    }

    /// Funds not reserved for owed payouts
    #[inline]
    pub fn unreserved(&self) -> Decimal {
        self.balance() - self.owed
    }

    /// Accept an incoming payment
    pub fn deposit(&mut self, source: DepositSource, amount: Decimal) -> Result<(), TreasuryError> {
        if amount <= Decimal::ZERO {
            return Err(TreasuryError::InvalidAmount);
        }

        match source {
            DepositSource::AirlineStake => self.stakes += amount,
            DepositSource::Premium => self.premiums += amount,
            DepositSource::OracleFee => self.oracle_fees += amount,
        }
        self.touch();
        Ok(())
    }

    /// Reserve credited payouts
    pub fn reserve(&mut self, amount: Decimal) -> Result<(), TreasuryError> {
        if amount < Decimal::ZERO {
            return Err(TreasuryError::InvalidAmount);
        }
        if amount.is_zero() {
            return Ok(());
        }

        self.owed += amount;
        self.touch();
        Ok(())
    }

    /// Move owed funds out of the treasury ahead of an external transfer
    pub fn disburse(&mut self, amount: Decimal) -> Result<(), TreasuryError> {
        if amount <= Decimal::ZERO {
            return Err(TreasuryError::InvalidAmount);
        }

        if self.owed < amount {
            return Err(TreasuryError::InsufficientOwed {
                required: amount,
                owed: self.owed,
            });
        }

        if self.balance() < amount {
            return Err(TreasuryError::InsufficientBalance {
                required: amount,
                available: self.balance(),
            });
        }

        self.owed -= amount;
        self.paid_out += amount;
        self.touch();
        Ok(())
    }

    /// Undo a [`disburse`](Self::disburse) whose transfer failed
    pub fn reverse_disbursement(&mut self, amount: Decimal) {
        self.paid_out -= amount;
        self.owed += amount;
        self.touch();
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl std::fmt::Display for Treasury {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Treasury(balance={}, owed={}, paid_out={})",
            self.balance(),
            self.owed,
            self.paid_out
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_treasury() {
        let treasury = Treasury::new();
        assert_eq!(treasury.balance(), Decimal::ZERO);
        assert_eq!(treasury.owed, Decimal::ZERO);
    }

    #[test]
    fn test_deposits_by_source() {
        let mut treasury = Treasury::new();
        treasury.deposit(DepositSource::AirlineStake, dec!(10)).unwrap();
        treasury.deposit(DepositSource::Premium, dec!(1)).unwrap();
        treasury.deposit(DepositSource::OracleFee, dec!(1)).unwrap();

        assert_eq!(treasury.balance(), dec!(12));
        assert_eq!(treasury.premiums, dec!(1));
        assert_eq!(
            treasury.deposit(DepositSource::Premium, dec!(0)),
            Err(TreasuryError::InvalidAmount)
        );
    }

    #[test]
    fn test_disburse_and_reverse() {
        let mut treasury = Treasury::new();
        treasury.deposit(DepositSource::AirlineStake, dec!(10)).unwrap();
        treasury.deposit(DepositSource::Premium, dec!(1)).unwrap();
        treasury.reserve(dec!(1.5)).unwrap();
        assert_eq!(treasury.unreserved(), dec!(9.5));

        treasury.disburse(dec!(1.5)).unwrap();
        assert_eq!(treasury.balance(), dec!(9.5));
        assert_eq!(treasury.owed, Decimal::ZERO);

        treasury.reverse_disbursement(dec!(1.5));
        assert_eq!(treasury.balance(), dec!(11));
        assert_eq!(treasury.owed, dec!(1.5));
    }

    #[test]
    fn test_cannot_disburse_more_than_held() {
        let mut treasury = Treasury::new();
        treasury.deposit(DepositSource::Premium, dec!(1)).unwrap();
        treasury.reserve(dec!(1.5)).unwrap();

        let result = treasury.disburse(dec!(1.5));
        assert!(matches!(
            result,
            Err(TreasuryError::InsufficientBalance { .. })
        ));
        assert_eq!(treasury.paid_out, Decimal::ZERO);
    }

    #[test]
    fn test_cannot_disburse_unowed() {
        let mut treasury = Treasury::new();
        treasury.deposit(DepositSource::AirlineStake, dec!(10)).unwrap();
        assert!(matches!(
            treasury.disburse(dec!(1)),
            Err(TreasuryError::InsufficientOwed { .. })
        ));
    }

    #[test]
    fn test_version_increment() {
        let mut treasury = Treasury::new();
        let initial = treasury.version;
        treasury.deposit(DepositSource::Premium, dec!(1)).unwrap();
        treasury.reserve(dec!(1)).unwrap();
        assert_eq!(treasury.version, initial + 2);
    }
}
