//! Airline registry - bootstrap-then-quorum admission
//!
//! Below `bootstrap_count` registered airlines a single funded airline admits
//! a candidate on its own. From then on every funded airline casts at most one
//! vote per candidate, and the candidate is admitted once its distinct votes
//! reach `ceil(n / 2)` where `n` is the registered count at the time of the
//! vote. The threshold is recomputed on every vote, never cached.

use rust_decimal::Decimal;
use std::collections::HashMap;
use surety_common::{
    AccessError, AccountId, Airline, AirlineState, LedgerError, RegistryError, Result,
};
use tracing::{debug, info};

/// Result of a registration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Candidate admitted
    Registered { votes: usize },
    /// Vote recorded, threshold not yet reached
    Pending { votes: usize, required: usize },
}

/// Airline membership and voting state
#[derive(Debug, Clone)]
pub struct AirlineRegistry {
    airlines: HashMap<AccountId, Airline>,
    bootstrap_count: usize,
    bootstrapped: bool,
}

impl AirlineRegistry {
    pub fn new(bootstrap_count: usize) -> Self {
        Self {
            airlines: HashMap::new(),
            bootstrap_count,
            bootstrapped: false,
        }
    }

    pub fn get(&self, id: &AccountId) -> Option<&Airline> {
        self.airlines.get(id)
    }

    pub fn len(&self) -> usize {
        self.airlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airlines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Airline> {
        self.airlines.values()
    }

    /// Airlines in the Registered or Funded state
    pub fn registered_count(&self) -> usize {
        self.airlines.values().filter(|a| a.is_registered()).count()
    }

    /// Votes a pending candidate needs right now
    pub fn required_votes(&self) -> usize {
        let n = self.registered_count();
        if n < self.bootstrap_count {
            1
        } else {
            n.div_ceil(2)
        }
    }

    /// Fail with `CallerNotFunded` unless `caller` is a funded airline
    pub fn require_funded(&self, caller: &AccountId) -> Result<&Airline> {
        match self.airlines.get(caller) {
            Some(airline) if airline.is_funded() => Ok(airline),
            _ => Err(AccessError::CallerNotFunded { caller: *caller }.into()),
        }
    }

    /// Seed the very first airline directly in the Registered state
    pub fn bootstrap(&mut self, id: AccountId, name: &str) -> Result<()> {
        if self.bootstrapped || !self.airlines.is_empty() {
            return Err(RegistryError::AlreadyBootstrapped.into());
        }

        let mut airline = Airline::new(id, name, None);
        airline.finalize_registration();
        self.airlines.insert(id, airline);
        self.bootstrapped = true;

        info!(airline = %id, name, "First airline bootstrapped");
        Ok(())
    }

    /// Propose a new airline
    pub fn add_airline(&mut self, caller: &AccountId, id: AccountId, name: &str) -> Result<()> {
        self.require_funded(caller)?;
        if self.airlines.contains_key(&id) {
            return Err(RegistryError::DuplicateAirline { airline: id }.into());
        }

        self.airlines
            .insert(id, Airline::new(id, name, Some(*caller)));

        info!(airline = %id, name, proposed_by = %caller, "Airline added");
        Ok(())
    }

    /// Vote for (or, on the fast path, directly admit) `candidate`
    pub fn register_airline(
        &mut self,
        caller: &AccountId,
        candidate: &AccountId,
    ) -> Result<RegistrationOutcome> {
        let registered = self.registered_count();
        self.require_funded(caller)?;

        let bootstrap_count = self.bootstrap_count;
        let airline = self
            .airlines
            .get_mut(candidate)
            .ok_or(RegistryError::UnknownAirline {
                airline: *candidate,
            })?;

        if airline.state != AirlineState::Added {
            return Err(RegistryError::InvalidAirlineState {
                airline: *candidate,
                state: airline.state,
            }
            .into());
        }

        if registered < bootstrap_count {
            airline.votes.insert(*caller);
            airline.finalize_registration();
            info!(
                airline = %candidate,
                by = %caller,
                registered = registered + 1,
                "Airline registered without consensus"
            );
            return Ok(RegistrationOutcome::Registered {
                votes: airline.vote_count(),
            });
        }

        if airline.votes.contains(caller) {
            return Err(RegistryError::DuplicateVote {
                voter: *caller,
                candidate: *candidate,
            }
            .into());
        }

        airline.votes.insert(*caller);
        let votes = airline.vote_count();
        let required = registered.div_ceil(2);

        if votes >= required {
            airline.finalize_registration();
            info!(airline = %candidate, votes, required, "Airline registered by consensus");
            Ok(RegistrationOutcome::Registered { votes })
        } else {
            debug!(airline = %candidate, voter = %caller, votes, required, "Registration vote recorded");
            Ok(RegistrationOutcome::Pending { votes, required })
        }
    }

    /// Post the airline stake; must be exactly `required`
    pub fn record_stake(
        &mut self,
        caller: &AccountId,
        amount: Decimal,
        required: Decimal,
    ) -> Result<AirlineState> {
        let airline = self
            .airlines
            .get_mut(caller)
            .ok_or(RegistryError::UnknownAirline { airline: *caller })?;

        if airline.is_funded() || airline.has_stake() {
            return Err(RegistryError::InvalidAirlineState {
                airline: *caller,
                state: airline.state,
            }
            .into());
        }

        if amount < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                provided: amount,
            }
            .into());
        }
        if amount > required {
            return Err(LedgerError::ExcessPayment {
                required,
                provided: amount,
            }
            .into());
        }

        airline.stake = amount;
        if airline.state == AirlineState::Registered {
            airline.state = AirlineState::Funded;
        }

        info!(airline = %caller, stake = %amount, state = %airline.state, "Airline stake recorded");
        Ok(airline.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use surety_common::{ErrorKind, SuretyError};

    fn id(n: usize) -> AccountId {
        AccountId::from_label(&format!("airline-{}", n))
    }

    /// Registry with `count` funded airlines, ids 0..count
    fn funded_registry(count: usize) -> AirlineRegistry {
        let mut registry = AirlineRegistry::new(4);
        registry.bootstrap(id(0), "Airline 0").unwrap();
        registry.record_stake(&id(0), dec!(10), dec!(10)).unwrap();

        for n in 1..count {
            registry.add_airline(&id(0), id(n), "Airline").unwrap();
            registry.record_stake(&id(n), dec!(10), dec!(10)).unwrap();
            let mut voter = 0;
            while registry.get(&id(n)).unwrap().state == AirlineState::Added {
                registry.register_airline(&id(voter), &id(n)).unwrap();
                voter += 1;
            }
        }
        registry
    }

    #[test]
    fn test_bootstrap_only_once() {
        let mut registry = AirlineRegistry::new(4);
        registry.bootstrap(id(0), "First").unwrap();
        assert_eq!(registry.registered_count(), 1);
        assert_eq!(
            registry.get(&id(0)).unwrap().state,
            AirlineState::Registered
        );

        let err = registry.bootstrap(id(1), "Second").unwrap_err();
        assert_eq!(err, SuretyError::Registry(RegistryError::AlreadyBootstrapped));
    }

    #[test]
    fn test_unfunded_airline_cannot_add_or_register() {
        let mut registry = AirlineRegistry::new(4);
        registry.bootstrap(id(0), "First").unwrap();

        let err = registry.add_airline(&id(0), id(1), "Second").unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Access(AccessError::CallerNotFunded { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_added_airline_with_stake_cannot_vote() {
        let mut registry = funded_registry(1);
        registry.add_airline(&id(0), id(1), "Pending").unwrap();
        registry.add_airline(&id(0), id(2), "Other").unwrap();
        registry.record_stake(&id(1), dec!(10), dec!(10)).unwrap();

        let err = registry.register_airline(&id(1), &id(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_duplicate_airline_rejected() {
        let mut registry = funded_registry(1);
        registry.add_airline(&id(0), id(1), "Second").unwrap();
        let err = registry.add_airline(&id(0), id(1), "Again").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_fast_path_below_bootstrap_count() {
        let mut registry = funded_registry(3);
        assert_eq!(registry.registered_count(), 3);

        registry.add_airline(&id(0), id(3), "Fourth").unwrap();
        let outcome = registry.register_airline(&id(2), &id(3)).unwrap();
        assert_eq!(outcome, RegistrationOutcome::Registered { votes: 1 });
        assert_eq!(registry.registered_count(), 4);
    }

    #[test]
    fn test_fifth_airline_needs_two_votes() {
        let mut registry = funded_registry(4);
        registry.add_airline(&id(0), id(4), "Fifth").unwrap();

        let outcome = registry.register_airline(&id(0), &id(4)).unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Pending {
                votes: 1,
                required: 2
            }
        );

        // Same voter again fails and does not count
        let err = registry.register_airline(&id(0), &id(4)).unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Registry(RegistryError::DuplicateVote { .. })
        ));
        assert_eq!(registry.get(&id(4)).unwrap().vote_count(), 1);
        assert_eq!(registry.get(&id(4)).unwrap().state, AirlineState::Added);

        let outcome = registry.register_airline(&id(1), &id(4)).unwrap();
        assert_eq!(outcome, RegistrationOutcome::Registered { votes: 2 });
        assert_eq!(
            registry.get(&id(4)).unwrap().state,
            AirlineState::Registered
        );
    }

    #[test]
    fn test_register_rejects_unknown_and_registered() {
        let mut registry = funded_registry(2);
        let err = registry.register_airline(&id(0), &id(9)).unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Registry(RegistryError::UnknownAirline { .. })
        ));

        let err = registry.register_airline(&id(0), &id(1)).unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Registry(RegistryError::InvalidAirlineState {
                state: AirlineState::Funded,
                ..
            })
        ));
    }

    #[test]
    fn test_threshold_follows_growing_registry() {
        let mut registry = funded_registry(4);
        registry.add_airline(&id(0), id(10), "Slow").unwrap();
        registry.register_airline(&id(0), &id(10)).unwrap();

        // Two more admissions raise n to 6, so the slow candidate now needs 3
        for n in [4, 5] {
            registry.add_airline(&id(0), id(n), "Airline").unwrap();
            registry.register_airline(&id(0), &id(n)).unwrap();
            registry.register_airline(&id(1), &id(n)).unwrap();
            if registry.get(&id(n)).unwrap().state == AirlineState::Added {
                registry.register_airline(&id(2), &id(n)).unwrap();
            }
        }
        assert_eq!(registry.registered_count(), 6);

        let outcome = registry.register_airline(&id(1), &id(10)).unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Pending {
                votes: 2,
                required: 3
            }
        );
        let outcome = registry.register_airline(&id(2), &id(10)).unwrap();
        assert_eq!(outcome, RegistrationOutcome::Registered { votes: 3 });
    }

    #[test]
    fn test_stake_must_be_exact() {
        let mut registry = AirlineRegistry::new(4);
        registry.bootstrap(id(0), "First").unwrap();

        let err = registry.record_stake(&id(0), dec!(9), dec!(10)).unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Ledger(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        let err = registry.record_stake(&id(0), dec!(11), dec!(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert!(!registry.get(&id(0)).unwrap().has_stake());

        assert_eq!(
            registry.record_stake(&id(0), dec!(10), dec!(10)).unwrap(),
            AirlineState::Funded
        );

        // Funded never regresses nor funds twice
        let err = registry.record_stake(&id(0), dec!(10), dec!(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(registry.get(&id(0)).unwrap().is_funded());
    }

    #[test]
    fn test_escrowed_stake_funds_on_registration() {
        let mut registry = funded_registry(1);
        registry.add_airline(&id(0), id(1), "Second").unwrap();
        assert_eq!(
            registry.record_stake(&id(1), dec!(10), dec!(10)).unwrap(),
            AirlineState::Added
        );
        registry.register_airline(&id(0), &id(1)).unwrap();
        assert!(registry.get(&id(1)).unwrap().is_funded());
    }

    proptest! {
        #[test]
        fn prop_registration_iff_half_of_registered(n in 4usize..12, voters in 1usize..12) {
            let mut registry = funded_registry(n);
            let candidate = AccountId::from_label("candidate");
            registry.add_airline(&id(0), candidate, "Candidate").unwrap();

            let voters = voters.min(n);
            let required = n.div_ceil(2);
            for v in 0..voters {
                let outcome = registry.register_airline(&id(v), &candidate);
                if v + 1 > required {
                    // Already registered by earlier votes
                    prop_assert!(outcome.is_err());
                } else {
                    prop_assert!(outcome.is_ok());
                }
            }

            let registered = registry.get(&candidate).unwrap().is_registered();
            prop_assert_eq!(registered, voters >= required);
        }
    }
}
