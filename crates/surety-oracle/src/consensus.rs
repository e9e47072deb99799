//! Oracle consensus
//!
//! Registers fee-paying oracles with three pseudo-random indexes, opens
//! status requests for registered flights, and aggregates responses from
//! oracles holding the request index. On consensus the flight status is
//! settled in the ledger and, for airline-fault delays, insurees credited.
//!
//! The consensus acts on the ledger under its own identity, which must be an
//! authorized caller of the ledger.

use crate::request::{ReportOutcome, RequestKey, StatusRequest};
use crate::sampler::IndexSampler;
use crate::OracleConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surety_common::{AccountId, FlightKey, FlightStatus, LedgerError, OracleError, Result};
use surety_ledger::{CreditSummary, SuretyLedger};
use tracing::{debug, info};

/// A registered oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    pub oracle: AccountId,
    /// Distinct indexes in `0..index_space`, fixed for life
    pub indexes: Vec<u8>,
    /// Ledger height at registration
    pub registered_at: u64,
}

impl OracleRecord {
    #[inline]
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Effect of an accepted oracle response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Vote counted toward `status`
    Recorded {
        status: FlightStatus,
        votes: usize,
        required: usize,
    },
    /// This response reached consensus
    Resolved {
        status: FlightStatus,
        credited: Option<CreditSummary>,
    },
    /// Request already resolved, or a repeated vote
    Ignored,
}

/// Oracle registry and request aggregation
#[derive(Debug, Clone)]
pub struct OracleConsensus {
    identity: AccountId,
    config: OracleConfig,
    oracles: HashMap<AccountId, OracleRecord>,
    requests: HashMap<RequestKey, StatusRequest>,
    sampler: IndexSampler,
}

impl OracleConsensus {
    /// Create consensus acting on the ledger as `identity`
    pub fn new(identity: AccountId, config: OracleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            identity,
            sampler: IndexSampler::new(config.index_space),
            config,
            oracles: HashMap::new(),
            requests: HashMap::new(),
        })
    }

    pub fn identity(&self) -> &AccountId {
        &self.identity
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn oracle(&self, oracle: &AccountId) -> Option<&OracleRecord> {
        self.oracles.get(oracle)
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_oracle_registered(&self, oracle: &AccountId) -> bool {
        self.oracles.contains_key(oracle)
    }

    /// Indexes assigned to a registered oracle
    pub fn oracle_indexes(&self, oracle: &AccountId) -> Option<&[u8]> {
        self.oracles.get(oracle).map(|r| r.indexes.as_slice())
    }

    pub fn request(&self, key: &RequestKey) -> Option<&StatusRequest> {
        self.requests.get(key)
    }

    /// Requests still collecting responses
    pub fn open_requests(&self) -> impl Iterator<Item = &StatusRequest> {
        self.requests.values().filter(|r| r.is_open())
    }

    /// Register `caller` as an oracle against the attached fee
    pub fn register_oracle(
        &mut self,
        ledger: &mut SuretyLedger,
        caller: &AccountId,
        value: Decimal,
    ) -> Result<Vec<u8>> {
        ledger.require_operational()?;
        if self.oracles.contains_key(caller) {
            return Err(OracleError::AlreadyRegistered { oracle: *caller }.into());
        }
        if value < self.config.registration_fee {
            return Err(OracleError::InsufficientFee {
                required: self.config.registration_fee,
                provided: value,
            }
            .into());
        }

        ledger.collect_oracle_fee(&self.identity, value)?;

        let head = ledger.chain().hash();
        let indexes = self
            .sampler
            .draw_indexes(caller, &[&head], self.config.index_count);

        info!(oracle = %caller, indexes = ?indexes, "Oracle registered");
        self.oracles.insert(
            *caller,
            OracleRecord {
                oracle: *caller,
                indexes: indexes.clone(),
                registered_at: ledger.chain().height(),
            },
        );
        Ok(indexes)
    }

    /// Open a status request for a registered, unsettled flight
    ///
    /// A request already open under the drawn index is returned unchanged; a
    /// resolved one starts a fresh round. Several indexes may be open for one
    /// flight; the first to settle it closes the others.
    pub fn fetch_flight_status(
        &mut self,
        ledger: &SuretyLedger,
        caller: &AccountId,
        airline: &AccountId,
        code: &str,
        timestamp: i64,
    ) -> Result<RequestKey> {
        ledger.require_operational()?;

        let flight = FlightKey::new(*airline, code, timestamp);
        let status = ledger
            .flight(&flight)
            .map(|f| f.status)
            .ok_or_else(|| LedgerError::UnknownFlight { key: flight.clone() })?;
        if status.is_settled() {
            return Err(LedgerError::FlightSettled { key: flight }.into());
        }

        let head = ledger.chain().hash();
        let digest = flight.digest();
        let index = self.sampler.draw_index(caller, &[&head, &digest]);
        let key = RequestKey::new(flight, index);

        match self.requests.get_mut(&key) {
            Some(request) if request.is_open() => {
                debug!(request = %key, "Status request already open");
            }
            Some(request) => {
                request.reopen(*caller);
                info!(request = %key, round = request.round, "Status request reopened");
            }
            None => {
                info!(request = %key, requester = %caller, "Status request opened");
                self.requests
                    .insert(key.clone(), StatusRequest::new(key.clone(), *caller));
            }
        }
        Ok(key)
    }

    /// Accept a response from an oracle holding the request index
    #[allow(clippy::too_many_arguments)]
    pub fn submit_oracle_response(
        &mut self,
        ledger: &mut SuretyLedger,
        caller: &AccountId,
        airline: &AccountId,
        code: &str,
        timestamp: i64,
        index: u8,
        status: FlightStatus,
    ) -> Result<ResponseOutcome> {
        ledger.require_operational()?;

        let holds = self
            .oracles
            .get(caller)
            .is_some_and(|record| record.holds(index));
        if !holds {
            return Err(OracleError::IndexMismatch {
                oracle: *caller,
                index,
            }
            .into());
        }

        let key = RequestKey::new(FlightKey::new(*airline, code, timestamp), index);
        let request = self
            .requests
            .get_mut(&key)
            .ok_or_else(|| OracleError::UnknownOrClosedRequest {
                key: key.flight.clone(),
                index,
            })?;

        let settled = ledger
            .flight(&key.flight)
            .is_some_and(|f| f.status.is_settled());
        if !request.is_open() || settled {
            debug!(request = %key, oracle = %caller, "Response after resolution ignored");
            return Ok(ResponseOutcome::Ignored);
        }

        // Settlement below must not fail after the vote lands
        ledger.require_authorized(&self.identity)?;

        match request.report(*caller, status, self.config.min_responses) {
            ReportOutcome::Ignored => Ok(ResponseOutcome::Ignored),
            ReportOutcome::Counted { votes, required } => {
                debug!(request = %key, status = %status, votes, required, "Oracle response recorded");
                Ok(ResponseOutcome::Recorded {
                    status,
                    votes,
                    required,
                })
            }
            ReportOutcome::Resolved(status) => {
                info!(request = %key, status = %status, "Flight status consensus reached");

                if status.is_settled() {
                    ledger.settle_flight_status(&self.identity, &key.flight, status)?;
                }
                let credited = if status.is_airline_fault() {
                    let multiplier = ledger.config().payout_multiplier_percent;
                    Some(ledger.credit_insurees(&self.identity, &key.flight, multiplier)?)
                } else {
                    None
                };

                if status.is_settled() {
                    self.close_siblings(&key, status);
                }
                Ok(ResponseOutcome::Resolved { status, credited })
            }
        }
    }

    /// Close the other open requests of a settled flight
    fn close_siblings(&mut self, settled: &RequestKey, status: FlightStatus) {
        let siblings = self
            .requests
            .values_mut()
            .filter(|r| r.key.flight == settled.flight && r.key.index != settled.index);
        for request in siblings {
            if request.close(status) {
                debug!(request = %request.key, status = %status, "Sibling status request closed");
            }
        }
    }
}
