//! InsurancePolicy - a passenger's cover on one flight
//!
//! A policy is credited at most once and withdrawn at most once.

use crate::types::{account_id::AccountId, flight::FlightKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sequential policy identifier
pub type PolicyId = u64;

/// Passenger insurance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub id: PolicyId,

    /// Insured passenger
    pub passenger: AccountId,

    /// Insured flight
    pub flight: FlightKey,

    /// Premium paid, in (0, cap]
    pub premium: Decimal,

    /// Payout in percent of premium, fixed at purchase and confirmed when credited
    pub multiplier_percent: u32,

    /// Owed payout, zero until credited
    pub credited: Decimal,

    /// Set once by crediting
    pub is_credited: bool,

    /// Set once by withdrawal
    pub is_withdrawn: bool,
}

impl InsurancePolicy {
    pub fn new(
        id: PolicyId,
        passenger: AccountId,
        flight: FlightKey,
        premium: Decimal,
        multiplier_percent: u32,
    ) -> Self {
        Self {
            id,
            passenger,
            flight,
            premium,
            multiplier_percent,
            credited: Decimal::ZERO,
            is_credited: false,
            is_withdrawn: false,
        }
    }

    /// Payout this policy is worth once credited
    pub fn payout(&self) -> Decimal {
        self.premium * Decimal::from(self.multiplier_percent) / Decimal::ONE_HUNDRED
    }

    /// Record the payout at `multiplier_percent`; returns the newly owed
    /// amount, zero if already credited
    pub fn credit(&mut self, multiplier_percent: u32) -> Decimal {
        if self.is_credited {
            return Decimal::ZERO;
        }
        self.multiplier_percent = multiplier_percent;
        self.credited = self.payout();
        self.is_credited = true;
        self.credited
    }

    /// Credited but not yet withdrawn
    #[inline]
    pub fn owed(&self) -> Decimal {
        if self.is_credited && !self.is_withdrawn {
            self.credited
        } else {
            Decimal::ZERO
        }
    }

    /// Not yet credited
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.is_credited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn policy(premium: Decimal) -> InsurancePolicy {
        InsurancePolicy::new(
            1,
            AccountId::from_label("passenger"),
            FlightKey::new(AccountId::from_label("airline"), "ABC-DEF-GHI", 0),
            premium,
            150,
        )
    }

    #[test]
    fn test_payout_is_one_and_a_half() {
        assert_eq!(policy(dec!(1)).payout(), dec!(1.5));
        assert_eq!(policy(dec!(0.2)).payout(), dec!(0.3));
    }

    #[test]
    fn test_credit_is_idempotent() {
        let mut p = policy(dec!(1));
        assert_eq!(p.credit(150), dec!(1.5));
        assert_eq!(p.credit(200), Decimal::ZERO);
        assert_eq!(p.credited, dec!(1.5));
        assert_eq!(p.owed(), dec!(1.5));
    }

    #[test]
    fn test_withdrawn_policy_owes_nothing() {
        let mut p = policy(dec!(1));
        p.credit(150);
        p.is_withdrawn = true;
        assert_eq!(p.owed(), Decimal::ZERO);
        assert!(!p.is_open());
    }
}
