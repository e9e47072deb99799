//! Status requests and response aggregation
//!
//! A request is keyed by flight and index. Responses are bucketed by status
//! code, one vote per oracle per bucket, and the request resolves the moment
//! any bucket reaches the threshold. Later responses are ignored. A request
//! can also be closed without reaching the threshold when another request for
//! the same flight settles it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use surety_common::{AccountId, FlightKey, FlightStatus};

/// Identity of a status request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub flight: FlightKey,
    pub index: u8,
}

impl RequestKey {
    pub fn new(flight: FlightKey, index: u8) -> Self {
        Self { flight, index }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.flight, self.index)
    }
}

/// Effect of a single report on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Vote counted, threshold not reached
    Counted { votes: usize, required: usize },
    /// This vote reached the threshold
    Resolved(FlightStatus),
    /// Request already resolved, or the oracle already voted for this status
    Ignored,
}

/// An open or resolved status request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub key: RequestKey,
    pub requester: AccountId,
    /// Incremented each time a resolved request is reopened
    pub round: u32,
    responses: BTreeMap<FlightStatus, BTreeSet<AccountId>>,
    resolved: Option<FlightStatus>,
}

impl StatusRequest {
    pub fn new(key: RequestKey, requester: AccountId) -> Self {
        Self {
            key,
            requester,
            round: 0,
            responses: BTreeMap::new(),
            resolved: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.resolved.is_none()
    }

    pub fn resolved(&self) -> Option<FlightStatus> {
        self.resolved
    }

    /// Votes recorded for `status`
    pub fn votes_for(&self, status: FlightStatus) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    /// Total distinct (oracle, status) votes
    pub fn total_votes(&self) -> usize {
        self.responses.values().map(BTreeSet::len).sum()
    }

    /// The status whose bucket meets `threshold`, if any
    pub fn leading(&self, threshold: usize) -> Option<FlightStatus> {
        self.responses
            .iter()
            .find(|(_, oracles)| oracles.len() >= threshold)
            .map(|(status, _)| *status)
    }

    /// Record a vote and resolve on threshold
    pub fn report(&mut self, oracle: AccountId, status: FlightStatus, threshold: usize) -> ReportOutcome {
        if self.resolved.is_some() {
            return ReportOutcome::Ignored;
        }

        let bucket = self.responses.entry(status).or_default();
        if !bucket.insert(oracle) {
            return ReportOutcome::Ignored;
        }

        let votes = bucket.len();
        if votes >= threshold {
            self.resolved = Some(status);
            ReportOutcome::Resolved(status)
        } else {
            ReportOutcome::Counted {
                votes,
                required: threshold,
            }
        }
    }

    /// Close an open request without a vote, once its flight settled under
    /// another index
    pub fn close(&mut self, status: FlightStatus) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        self.resolved = Some(status);
        true
    }

    /// Start a fresh round on a resolved request
    pub fn reopen(&mut self, requester: AccountId) {
        self.responses.clear();
        self.resolved = None;
        self.requester = requester;
        self.round += 1;
    }
}
