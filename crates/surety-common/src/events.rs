//! Notifications emitted on committed state transitions
//!
//! External processes (UI, oracle daemons) react to these instead of
//! polling. Every event carries the keys needed to act on it.

use crate::types::{
    account_id::AccountId,
    flight::{FlightKey, FlightStatus},
    policy::PolicyId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event types emitted by the facade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SuretyEvent {
    /// Operational switch toggled
    OperationalStatusChanged { operational: bool },

    /// Caller authorized to credit insurees and settle flights
    CallerAuthorized { caller: AccountId },

    /// Caller authorization revoked
    CallerDeauthorized { caller: AccountId },

    /// Airline proposed
    AirlineAdded {
        airline: AccountId,
        name: String,
        proposed_by: Option<AccountId>,
    },

    /// Vote recorded without reaching the threshold
    AirlineVoted {
        candidate: AccountId,
        voter: AccountId,
        votes: usize,
        required: usize,
    },

    /// Airline admitted
    AirlineRegistered { airline: AccountId, votes: usize },

    /// Airline stake received
    FundsSubmitted { airline: AccountId, amount: Decimal },

    /// Flight opened for insurance
    FlightRegistered { flight: FlightKey },

    /// Passenger bought cover
    InsurancePurchased {
        policy_id: PolicyId,
        passenger: AccountId,
        flight: FlightKey,
        premium: Decimal,
    },

    /// Oracle received its index set
    OracleRegistered { oracle: AccountId, indexes: Vec<u8> },

    /// Oracles holding `index` should report on `flight`
    StatusRequestOpened {
        flight: FlightKey,
        index: u8,
        requester: AccountId,
    },

    /// An oracle report was counted
    OracleReported {
        flight: FlightKey,
        index: u8,
        oracle: AccountId,
        status: FlightStatus,
    },

    /// Enough oracles agreed
    StatusResolved {
        flight: FlightKey,
        index: u8,
        status: FlightStatus,
    },

    /// Payouts recorded for a flight's policies
    FundsCredited {
        flight: FlightKey,
        policies: usize,
        total: Decimal,
    },

    /// Passenger received owed payouts
    FundsWithdrawn { passenger: AccountId, amount: Decimal },
}

impl SuretyEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SuretyEvent::OperationalStatusChanged { .. } => "operational_status_changed",
            SuretyEvent::CallerAuthorized { .. } => "caller_authorized",
            SuretyEvent::CallerDeauthorized { .. } => "caller_deauthorized",
            SuretyEvent::AirlineAdded { .. } => "airline_added",
            SuretyEvent::AirlineVoted { .. } => "airline_voted",
            SuretyEvent::AirlineRegistered { .. } => "airline_registered",
            SuretyEvent::FundsSubmitted { .. } => "funds_submitted",
            SuretyEvent::FlightRegistered { .. } => "flight_registered",
            SuretyEvent::InsurancePurchased { .. } => "insurance_purchased",
            SuretyEvent::OracleRegistered { .. } => "oracle_registered",
            SuretyEvent::StatusRequestOpened { .. } => "status_request_opened",
            SuretyEvent::OracleReported { .. } => "oracle_reported",
            SuretyEvent::StatusResolved { .. } => "status_resolved",
            SuretyEvent::FundsCredited { .. } => "funds_credited",
            SuretyEvent::FundsWithdrawn { .. } => "funds_withdrawn",
        }
    }
}

/// Event stamped with the ledger height that committed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Ledger height after the committing call
    pub height: u64,
    /// Wall-clock emission time (Unix milliseconds)
    pub emitted_at: i64,
    pub event: SuretyEvent,
}

impl EventEnvelope {
    pub fn new(height: u64, event: SuretyEvent) -> Self {
        Self {
            height,
            emitted_at: chrono::Utc::now().timestamp_millis(),
            event,
        }
    }
}
