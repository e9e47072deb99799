//! Insurance ledger - flights, policies, and owed payouts
//!
//! Holds bookkeeping only: money moves through the [`Treasury`](crate::treasury::Treasury)
//! and the [`PayoutRail`](crate::payout::PayoutRail), coordinated by
//! [`SuretyLedger`](crate::SuretyLedger).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use surety_common::{
    AccountId, Flight, FlightKey, FlightStatus, InsurancePolicy, LedgerError, PolicyId, Result,
};
use tracing::{debug, info};

/// Outcome of crediting a flight's policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub flight: FlightKey,
    /// Policies credited by this call
    pub policies: usize,
    /// Amount newly owed by this call
    pub total: Decimal,
}

/// Owed payouts claimed by a withdrawal, kept for rollback
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub passenger: AccountId,
    pub total: Decimal,
    pub policies: Vec<PolicyId>,
}

/// Flights and the policies written against them
#[derive(Debug, Clone, Default)]
pub struct InsuranceLedger {
    flights: HashMap<FlightKey, Flight>,
    policies: BTreeMap<PolicyId, InsurancePolicy>,
    by_flight: HashMap<FlightKey, Vec<PolicyId>>,
    by_passenger: HashMap<AccountId, Vec<PolicyId>>,
    next_policy_id: PolicyId,
}

impl InsuranceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    pub fn flights(&self) -> impl Iterator<Item = &Flight> {
        self.flights.values()
    }

    pub fn policy(&self, id: PolicyId) -> Option<&InsurancePolicy> {
        self.policies.get(&id)
    }

    /// Policies held by `passenger`, oldest first
    pub fn policies_of(&self, passenger: &AccountId) -> Vec<&InsurancePolicy> {
        self.by_passenger
            .get(passenger)
            .map(|ids| ids.iter().filter_map(|id| self.policies.get(id)).collect())
            .unwrap_or_default()
    }

    /// Policies written on `key`, oldest first
    pub fn policies_on(&self, key: &FlightKey) -> Vec<&InsurancePolicy> {
        self.by_flight
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.policies.get(id)).collect())
            .unwrap_or_default()
    }

    /// Open a flight for insurance with status Unknown
    pub fn register_flight(&mut self, key: FlightKey) -> Result<()> {
        if self.flights.contains_key(&key) {
            return Err(LedgerError::DuplicateFlight { key }.into());
        }

        info!(flight = %key, "Flight registered");
        self.flights.insert(key.clone(), Flight::new(key));
        Ok(())
    }

    /// Find the flight for (airline, code); without a timestamp the latest
    /// scheduled departure wins
    pub fn resolve_flight(
        &self,
        airline: &AccountId,
        code: &str,
        timestamp: Option<i64>,
    ) -> Result<FlightKey> {
        match timestamp {
            Some(ts) => {
                let key = FlightKey::new(*airline, code, ts);
                if self.flights.contains_key(&key) {
                    Ok(key)
                } else {
                    Err(LedgerError::UnknownFlight { key }.into())
                }
            }
            None => self
                .flights
                .keys()
                .filter(|k| k.airline == *airline && k.code == code)
                .max_by_key(|k| k.timestamp)
                .cloned()
                .ok_or_else(|| {
                    LedgerError::UnknownFlight {
                        key: FlightKey::new(*airline, code, 0),
                    }
                    .into()
                }),
        }
    }

    /// Write a policy on an unsettled flight; premium must lie in (0, cap]
    pub fn open_policy(
        &mut self,
        passenger: AccountId,
        key: &FlightKey,
        premium: Decimal,
        cap: Decimal,
        multiplier_percent: u32,
    ) -> Result<&InsurancePolicy> {
        let flight = self
            .flights
            .get(key)
            .ok_or_else(|| LedgerError::UnknownFlight { key: key.clone() })?;
        if flight.status.is_settled() {
            return Err(LedgerError::FlightSettled { key: key.clone() }.into());
        }

        if premium <= Decimal::ZERO || premium > cap {
            return Err(LedgerError::InvalidPremium { premium, cap }.into());
        }

        let has_open = self
            .policies_on(key)
            .iter()
            .any(|p| p.passenger == passenger && p.is_open());
        if has_open {
            return Err(LedgerError::DuplicatePolicy {
                passenger,
                key: key.clone(),
            }
            .into());
        }

        self.next_policy_id += 1;
        let id = self.next_policy_id;
        let policy = InsurancePolicy::new(id, passenger, key.clone(), premium, multiplier_percent);

        self.by_flight.entry(key.clone()).or_default().push(id);
        self.by_passenger.entry(passenger).or_default().push(id);

        info!(policy_id = id, passenger = %passenger, flight = %key, premium = %premium, "Policy opened");
        Ok(&*self.policies.entry(id).or_insert(policy))
    }

    /// Credit every open policy on `key`; already credited policies are skipped
    pub fn credit_flight(&mut self, key: &FlightKey, multiplier_percent: u32) -> Result<CreditSummary> {
        if !self.flights.contains_key(key) {
            return Err(LedgerError::UnknownFlight { key: key.clone() }.into());
        }

        let mut summary = CreditSummary {
            flight: key.clone(),
            policies: 0,
            total: Decimal::ZERO,
        };

        for id in self.by_flight.get(key).into_iter().flatten() {
            if let Some(policy) = self.policies.get_mut(id) {
                if policy.is_open() {
                    summary.total += policy.credit(multiplier_percent);
                    summary.policies += 1;
                }
            }
        }

        debug!(flight = %key, policies = summary.policies, total = %summary.total, "Flight credited");
        Ok(summary)
    }

    /// Record the consensus status of a flight; a settled status is final
    pub fn set_status(&mut self, key: &FlightKey, status: FlightStatus) -> Result<()> {
        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| LedgerError::UnknownFlight { key: key.clone() })?;
        if flight.status.is_settled() {
            return Err(LedgerError::FlightSettled { key: key.clone() }.into());
        }
        flight.status = status;
        Ok(())
    }

    /// Sum of credited, unwithdrawn payouts for `passenger`
    pub fn owed_to(&self, passenger: &AccountId) -> Decimal {
        self.policies_of(passenger).iter().map(|p| p.owed()).sum()
    }

    /// Mark every owed policy of `passenger` withdrawn and return the claim
    pub fn claim_owed(&mut self, passenger: &AccountId) -> Claim {
        let mut claim = Claim {
            passenger: *passenger,
            total: Decimal::ZERO,
            policies: Vec::new(),
        };

        for id in self.by_passenger.get(passenger).into_iter().flatten() {
            if let Some(policy) = self.policies.get_mut(id) {
                let owed = policy.owed();
                if owed > Decimal::ZERO {
                    policy.is_withdrawn = true;
                    claim.total += owed;
                    claim.policies.push(*id);
                }
            }
        }
        claim
    }

    /// Reopen the policies of a claim whose transfer failed
    pub fn restore_claim(&mut self, claim: &Claim) {
        for id in &claim.policies {
            if let Some(policy) = self.policies.get_mut(id) {
                policy.is_withdrawn = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use surety_common::{ErrorKind, SuretyError};

    fn flight_key() -> FlightKey {
        FlightKey::new(AccountId::from_label("airline"), "ABC-DEF-GHI", 1_700_000_000)
    }

    fn ledger_with_flight() -> InsuranceLedger {
        let mut ledger = InsuranceLedger::new();
        ledger.register_flight(flight_key()).unwrap();
        ledger
    }

    #[test]
    fn test_duplicate_flight() {
        let mut ledger = ledger_with_flight();
        let err = ledger.register_flight(flight_key()).unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Ledger(LedgerError::DuplicateFlight { .. })
        ));
    }

    #[test]
    fn test_resolve_latest_without_timestamp() {
        let mut ledger = ledger_with_flight();
        let later = FlightKey::new(AccountId::from_label("airline"), "ABC-DEF-GHI", 1_800_000_000);
        ledger.register_flight(later.clone()).unwrap();

        let airline = AccountId::from_label("airline");
        assert_eq!(ledger.resolve_flight(&airline, "ABC-DEF-GHI", None).unwrap(), later);
        assert_eq!(
            ledger
                .resolve_flight(&airline, "ABC-DEF-GHI", Some(1_700_000_000))
                .unwrap(),
            flight_key()
        );
        assert_eq!(
            ledger.resolve_flight(&airline, "NOPE", None).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_premium_bounds() {
        let mut ledger = ledger_with_flight();
        let passenger = AccountId::from_label("passenger");

        for premium in [dec!(0), dec!(-1), dec!(1.01)] {
            let err = ledger
                .open_policy(passenger, &flight_key(), premium, dec!(1), 150)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        }
        assert!(ledger
            .open_policy(passenger, &flight_key(), dec!(1), dec!(1), 150)
            .is_ok());
    }

    #[test]
    fn test_no_cover_on_settled_flight() {
        let mut ledger = ledger_with_flight();
        ledger
            .set_status(&flight_key(), FlightStatus::LateAirline)
            .unwrap();

        let err = ledger
            .open_policy(AccountId::from_label("late"), &flight_key(), dec!(1), dec!(1), 150)
            .unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Ledger(LedgerError::FlightSettled { .. })
        ));
        assert!(ledger.policies_on(&flight_key()).is_empty());
    }

    #[test]
    fn test_settled_status_is_final() {
        let mut ledger = ledger_with_flight();
        ledger
            .set_status(&flight_key(), FlightStatus::LateAirline)
            .unwrap();

        let err = ledger
            .set_status(&flight_key(), FlightStatus::OnTime)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(
            ledger.flight(&flight_key()).unwrap().status,
            FlightStatus::LateAirline
        );
    }

    #[test]
    fn test_one_open_policy_per_flight() {
        let mut ledger = ledger_with_flight();
        let passenger = AccountId::from_label("passenger");
        ledger
            .open_policy(passenger, &flight_key(), dec!(0.5), dec!(1), 150)
            .unwrap();

        let err = ledger
            .open_policy(passenger, &flight_key(), dec!(0.5), dec!(1), 150)
            .unwrap_err();
        assert!(matches!(
            err,
            SuretyError::Ledger(LedgerError::DuplicatePolicy { .. })
        ));

        // Once credited, a new policy may be written
        ledger.credit_flight(&flight_key(), 150).unwrap();
        assert!(ledger
            .open_policy(passenger, &flight_key(), dec!(0.5), dec!(1), 150)
            .is_ok());
        assert_eq!(ledger.policies_of(&passenger).len(), 2);
    }

    #[test]
    fn test_credit_twice_pays_once() {
        let mut ledger = ledger_with_flight();
        let a = AccountId::from_label("a");
        let b = AccountId::from_label("b");
        ledger.open_policy(a, &flight_key(), dec!(1), dec!(1), 150).unwrap();
        ledger.open_policy(b, &flight_key(), dec!(0.4), dec!(1), 150).unwrap();

        let first = ledger.credit_flight(&flight_key(), 150).unwrap();
        assert_eq!(first.policies, 2);
        assert_eq!(first.total, dec!(2.1));

        let second = ledger.credit_flight(&flight_key(), 150).unwrap();
        assert_eq!(second.policies, 0);
        assert_eq!(second.total, Decimal::ZERO);
        assert_eq!(ledger.owed_to(&a), dec!(1.5));
    }

    #[test]
    fn test_claim_and_restore() {
        let mut ledger = ledger_with_flight();
        let passenger = AccountId::from_label("passenger");
        ledger
            .open_policy(passenger, &flight_key(), dec!(1), dec!(1), 150)
            .unwrap();
        ledger.credit_flight(&flight_key(), 150).unwrap();

        let claim = ledger.claim_owed(&passenger);
        assert_eq!(claim.total, dec!(1.5));
        assert_eq!(ledger.owed_to(&passenger), Decimal::ZERO);

        ledger.restore_claim(&claim);
        assert_eq!(ledger.owed_to(&passenger), dec!(1.5));
    }

    #[test]
    fn test_set_status_unknown_flight() {
        let mut ledger = InsuranceLedger::new();
        let err = ledger
            .set_status(&flight_key(), FlightStatus::LateAirline)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
