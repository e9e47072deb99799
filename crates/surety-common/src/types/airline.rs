//! Airline - registry entry and admission lifecycle
//!
//! Lifecycle: `Added → Registered → Funded`. An airline never regresses.
//! An Added airline may post its stake while still awaiting votes; the stake
//! is held and the airline becomes Funded the moment registration finalizes.

use crate::types::account_id::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Admission lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirlineState {
    /// Proposed, awaiting registration
    Added,
    /// Admitted, stake not yet posted
    Registered,
    /// Admitted and staked; may vote and operate flights
    Funded,
}

impl std::fmt::Display for AirlineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AirlineState::Added => write!(f, "added"),
            AirlineState::Registered => write!(f, "registered"),
            AirlineState::Funded => write!(f, "funded"),
        }
    }
}

/// Airline registry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airline {
    /// Airline identity
    pub id: AccountId,

    /// Display name
    pub name: String,

    /// Current lifecycle stage
    pub state: AirlineState,

    /// Airlines that voted to register this one
    pub votes: BTreeSet<AccountId>,

    /// Stake posted (zero until funded)
    pub stake: Decimal,

    /// Funded airline that proposed this one (`None` for the bootstrap airline)
    pub proposed_by: Option<AccountId>,
}

impl Airline {
    /// Create a freshly proposed airline
    pub fn new(id: AccountId, name: impl Into<String>, proposed_by: Option<AccountId>) -> Self {
        Self {
            id,
            name: name.into(),
            state: AirlineState::Added,
            votes: BTreeSet::new(),
            stake: Decimal::ZERO,
            proposed_by,
        }
    }

    /// Registered or Funded
    #[inline]
    pub fn is_registered(&self) -> bool {
        self.state != AirlineState::Added
    }

    /// Stake has been posted, whether or not registration has finalized
    #[inline]
    pub fn has_stake(&self) -> bool {
        self.stake > Decimal::ZERO
    }

    /// Registered and staked
    #[inline]
    pub fn is_funded(&self) -> bool {
        self.state == AirlineState::Funded
    }

    /// Number of distinct votes received
    #[inline]
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Move to the registered stage, landing on Funded if a stake is already held
    pub fn finalize_registration(&mut self) {
        self.state = if self.has_stake() {
            AirlineState::Funded
        } else {
            AirlineState::Registered
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_airline_is_added() {
        let airline = Airline::new(AccountId::from_label("a"), "Air A", None);
        assert_eq!(airline.state, AirlineState::Added);
        assert!(!airline.is_registered());
        assert!(!airline.has_stake());
        assert_eq!(airline.vote_count(), 0);
    }

    #[test]
    fn test_finalize_with_escrowed_stake() {
        let mut airline = Airline::new(AccountId::from_label("a"), "Air A", None);
        airline.stake = dec!(10);
        airline.finalize_registration();
        assert!(airline.is_funded());

        let mut unstaked = Airline::new(AccountId::from_label("b"), "Air B", None);
        unstaked.finalize_registration();
        assert_eq!(unstaked.state, AirlineState::Registered);
    }
}
