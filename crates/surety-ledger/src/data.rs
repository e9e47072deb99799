//! SuretyLedger - the data side of the engine
//!
//! Composes the switch, registry, insurance ledger and treasury behind one
//! `&mut self` surface. Every mutating method checks the switch first and
//! validates fully before mutating, so a failed call leaves no trace.
//!
//! Crediting and flight settlement are reserved for authorized callers (the
//! oracle consensus identity); the administrator manages that set.

use crate::chain::ChainHead;
use crate::insurance::{CreditSummary, InsuranceLedger};
use crate::payout::PayoutRail;
use crate::registry::{AirlineRegistry, RegistrationOutcome};
use crate::switch::OperationalSwitch;
use crate::treasury::{DepositSource, Treasury, TreasuryError};
use crate::LedgerConfig;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use surety_common::{
    AccessError, AccountId, Airline, AirlineState, Flight, FlightKey, FlightStatus,
    InsurancePolicy, LedgerError, PolicyId, Result, SuretyError,
};
use tracing::{info, instrument, warn};

fn treasury_error(err: TreasuryError) -> SuretyError {
    LedgerError::TransferFailed(err.to_string()).into()
}

/// Owned state of the insurance engine
#[derive(Debug, Clone)]
pub struct SuretyLedger {
    /// Identity of this ledger (its "data address")
    id: AccountId,
    config: LedgerConfig,
    switch: OperationalSwitch,
    airlines: AirlineRegistry,
    insurance: InsuranceLedger,
    treasury: Treasury,
    authorized: BTreeSet<AccountId>,
    chain: ChainHead,
}

impl SuretyLedger {
    /// Create a ledger administered by `admin`
    pub fn new(id: AccountId, admin: AccountId, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            airlines: AirlineRegistry::new(config.bootstrap_airline_count),
            config,
            switch: OperationalSwitch::new(admin),
            insurance: InsuranceLedger::new(),
            treasury: Treasury::new(),
            authorized: BTreeSet::new(),
            chain: ChainHead::genesis(),
        })
    }

    // ============ OPERATIONAL SWITCH ============

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn admin(&self) -> &AccountId {
        self.switch.admin()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn is_operational(&self) -> bool {
        self.switch.is_operational()
    }

    pub fn require_operational(&self) -> Result<()> {
        self.switch.require_operational()
    }

    /// Pause or resume; administrator only, allowed while paused
    pub fn set_operational(&mut self, caller: &AccountId, operational: bool) -> Result<bool> {
        self.switch.set_operational(caller, operational)
    }

    // ============ AUTHORIZED CALLERS ============

    pub fn is_authorized(&self, caller: &AccountId) -> bool {
        self.authorized.contains(caller)
    }

    /// Fail with `Unauthorized` unless `caller` is authorized
    pub fn require_authorized(&self, caller: &AccountId) -> Result<()> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { caller: *caller }.into())
        }
    }

    /// Grant `contract` the right to credit insurees and settle flights
    pub fn authorize_caller(&mut self, caller: &AccountId, contract: AccountId) -> Result<bool> {
        self.require_operational()?;
        self.switch.require_admin(caller)?;
        let added = self.authorized.insert(contract);
        if added {
            info!(contract = %contract, "Caller authorized");
        }
        Ok(added)
    }

    pub fn deauthorize_caller(&mut self, caller: &AccountId, contract: &AccountId) -> Result<bool> {
        self.require_operational()?;
        self.switch.require_admin(caller)?;
        let removed = self.authorized.remove(contract);
        if removed {
            info!(contract = %contract, "Caller deauthorized");
        }
        Ok(removed)
    }

    // ============ AIRLINE REGISTRY ============

    pub fn airline(&self, id: &AccountId) -> Option<&Airline> {
        self.airlines.get(id)
    }

    pub fn airlines(&self) -> &AirlineRegistry {
        &self.airlines
    }

    pub fn is_airline_registered(&self, id: &AccountId) -> bool {
        self.airlines.get(id).is_some_and(|a| a.is_registered())
    }

    pub fn is_airline_funded(&self, id: &AccountId) -> bool {
        self.airlines.get(id).is_some_and(|a| a.is_funded())
    }

    pub fn registered_airline_count(&self) -> usize {
        self.airlines.registered_count()
    }

    /// Seed the first airline; administrator only, once
    pub fn bootstrap_airline(
        &mut self,
        caller: &AccountId,
        airline: AccountId,
        name: &str,
    ) -> Result<()> {
        self.require_operational()?;
        self.switch.require_admin(caller)?;
        self.airlines.bootstrap(airline, name)
    }

    pub fn add_airline(&mut self, caller: &AccountId, airline: AccountId, name: &str) -> Result<()> {
        self.require_operational()?;
        self.airlines.add_airline(caller, airline, name)
    }

    pub fn register_airline(
        &mut self,
        caller: &AccountId,
        candidate: &AccountId,
    ) -> Result<RegistrationOutcome> {
        self.require_operational()?;
        self.airlines.register_airline(caller, candidate)
    }

    /// Accept the airline stake attached to the call
    pub fn submit_airline_registration_fund(
        &mut self,
        caller: &AccountId,
        value: Decimal,
    ) -> Result<AirlineState> {
        self.require_operational()?;
        let state = self
            .airlines
            .record_stake(caller, value, self.config.airline_stake)?;
        self.treasury
            .deposit(DepositSource::AirlineStake, value)
            .map_err(treasury_error)?;
        Ok(state)
    }

    // ============ INSURANCE LEDGER ============

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.insurance.flight(key)
    }

    pub fn insurance(&self) -> &InsuranceLedger {
        &self.insurance
    }

    pub fn policy(&self, id: PolicyId) -> Option<&InsurancePolicy> {
        self.insurance.policy(id)
    }

    pub fn policies_of(&self, passenger: &AccountId) -> Vec<&InsurancePolicy> {
        self.insurance.policies_of(passenger)
    }

    pub fn owed_to(&self, passenger: &AccountId) -> Decimal {
        self.insurance.owed_to(passenger)
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// Open a flight of `airline`; the caller must be that airline and funded
    pub fn register_flight(
        &mut self,
        caller: &AccountId,
        airline: &AccountId,
        code: &str,
        timestamp: i64,
    ) -> Result<FlightKey> {
        self.require_operational()?;
        if caller != airline {
            return Err(AccessError::Unauthorized { caller: *caller }.into());
        }
        self.airlines.require_funded(caller)?;

        let key = FlightKey::new(*airline, code, timestamp);
        self.insurance.register_flight(key.clone())?;
        Ok(key)
    }

    /// Buy cover on a flight with the premium attached to the call
    #[instrument(skip(self, passenger), fields(passenger = %passenger))]
    pub fn buy_insurance(
        &mut self,
        passenger: &AccountId,
        airline: &AccountId,
        code: &str,
        timestamp: Option<i64>,
        value: Decimal,
    ) -> Result<InsurancePolicy> {
        self.require_operational()?;
        let key = self.insurance.resolve_flight(airline, code, timestamp)?;
        let policy = self
            .insurance
            .open_policy(
                *passenger,
                &key,
                value,
                self.config.premium_cap,
                self.config.payout_multiplier_percent,
            )?
            .clone();
        self.treasury
            .deposit(DepositSource::Premium, value)
            .map_err(treasury_error)?;
        Ok(policy)
    }

    /// Record payouts for every open policy on `key`; authorized callers only
    pub fn credit_insurees(
        &mut self,
        caller: &AccountId,
        key: &FlightKey,
        multiplier_percent: u32,
    ) -> Result<CreditSummary> {
        self.require_operational()?;
        self.require_authorized(caller)?;

        let summary = self.insurance.credit_flight(key, multiplier_percent)?;
        self.treasury
            .reserve(summary.total)
            .map_err(treasury_error)?;

        if summary.policies > 0 {
            info!(flight = %key, policies = summary.policies, total = %summary.total, "Insurees credited");
        }
        Ok(summary)
    }

    /// Write the consensus status of a flight; authorized callers only
    pub fn settle_flight_status(
        &mut self,
        caller: &AccountId,
        key: &FlightKey,
        status: FlightStatus,
    ) -> Result<()> {
        self.require_operational()?;
        self.require_authorized(caller)?;
        self.insurance.set_status(key, status)?;
        info!(flight = %key, status = %status, "Flight status settled");
        Ok(())
    }

    /// Accept an oracle registration fee; authorized callers only
    pub fn collect_oracle_fee(&mut self, caller: &AccountId, value: Decimal) -> Result<()> {
        self.require_operational()?;
        self.require_authorized(caller)?;
        self.treasury
            .deposit(DepositSource::OracleFee, value)
            .map_err(treasury_error)
    }

    /// Pay out everything owed to `passenger`
    ///
    /// Policies are marked withdrawn and the treasury debited before the
    /// transfer; a failed transfer reverses both.
    #[instrument(skip(self, passenger, rail), fields(passenger = %passenger))]
    pub fn withdraw_funds(
        &mut self,
        passenger: &AccountId,
        rail: &mut dyn PayoutRail,
    ) -> Result<Decimal> {
        self.require_operational()?;
        if self.insurance.owed_to(passenger).is_zero() {
            return Err(LedgerError::NothingToWithdraw.into());
        }

        let claim = self.insurance.claim_owed(passenger);
        if let Err(err) = self.treasury.disburse(claim.total) {
            self.insurance.restore_claim(&claim);
            warn!(error = %err, amount = %claim.total, "Treasury cannot cover withdrawal");
            return Err(treasury_error(err));
        }

        if let Err(err) = rail.transfer(passenger, claim.total) {
            self.treasury.reverse_disbursement(claim.total);
            self.insurance.restore_claim(&claim);
            warn!(error = %err, amount = %claim.total, "Payout transfer failed, withdrawal reversed");
            return Err(LedgerError::TransferFailed(err.to_string()).into());
        }

        info!(amount = %claim.total, policies = claim.policies.len(), "Funds withdrawn");
        Ok(claim.total)
    }

    // ============ CHAIN ============

    pub fn chain(&self) -> &ChainHead {
        &self.chain
    }

    /// Fold a committed call into the chain head
    pub fn commit(&mut self, payload: &[u8]) -> u64 {
        self.chain.advance(payload)
    }
}
