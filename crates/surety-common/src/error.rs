//! Error types for FlightSurety
//!
//! Provides a unified error type, domain-specific error variants and the
//! coarse [`ErrorKind`] taxonomy surfaced to callers. Every error aborts the
//! whole call: no operation leaves partial state behind.

use crate::types::{account_id::AccountId, airline::AirlineState, flight::FlightKey};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using SuretyError
pub type Result<T> = std::result::Result<T, SuretyError>;

/// Unified error type for FlightSurety operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SuretyError {
    // Access control errors
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    // Airline registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // Flight, policy and funds errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Oracle protocol errors
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // The single-writer service is gone
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    // Committed notifications could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks the required role or identity
    Unauthorized,
    /// Operational switch is off
    SystemPaused,
    /// Entity unknown or in the wrong lifecycle stage
    InvalidState,
    /// Payment outside the required bounds
    InvalidAmount,
    /// Idempotency violation
    Duplicate,
    /// Oracle index or request violation
    OracleProtocol,
    /// No credited balance to withdraw
    NothingToWithdraw,
    /// External value transfer failed and was rolled back
    TransferFailed,
    /// Host or service level failure
    Internal,
}

impl SuretyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SuretyError::Access(err) => match err {
                AccessError::SystemPaused => ErrorKind::SystemPaused,
                AccessError::Unauthorized { .. } | AccessError::CallerNotFunded { .. } => {
                    ErrorKind::Unauthorized
                }
            },
            SuretyError::Registry(err) => match err {
                RegistryError::DuplicateAirline { .. } | RegistryError::DuplicateVote { .. } => {
                    ErrorKind::Duplicate
                }
                RegistryError::UnknownAirline { .. }
                | RegistryError::InvalidAirlineState { .. }
                | RegistryError::AlreadyBootstrapped => ErrorKind::InvalidState,
            },
            SuretyError::Ledger(err) => match err {
                LedgerError::InsufficientFunds { .. }
                | LedgerError::ExcessPayment { .. }
                | LedgerError::InvalidPremium { .. } => ErrorKind::InvalidAmount,
                LedgerError::DuplicateFlight { .. } | LedgerError::DuplicatePolicy { .. } => {
                    ErrorKind::Duplicate
                }
                LedgerError::UnknownFlight { .. } | LedgerError::FlightSettled { .. } => {
                    ErrorKind::InvalidState
                }
                LedgerError::NothingToWithdraw => ErrorKind::NothingToWithdraw,
                LedgerError::TransferFailed(_) => ErrorKind::TransferFailed,
            },
            SuretyError::Oracle(err) => match err {
                OracleError::AlreadyRegistered { .. } => ErrorKind::Duplicate,
                OracleError::InsufficientFee { .. } => ErrorKind::InvalidAmount,
                OracleError::IndexMismatch { .. }
                | OracleError::UnknownOrClosedRequest { .. }
                | OracleError::InvalidStatusCode(_) => ErrorKind::OracleProtocol,
            },
            SuretyError::Config(_) | SuretyError::Unavailable(_) | SuretyError::Encoding(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Access control errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("{caller} is not authorized for this operation")]
    Unauthorized { caller: AccountId },

    #[error("System is paused")]
    SystemPaused,

    #[error("Caller {caller} is not a funded airline")]
    CallerNotFunded { caller: AccountId },
}

/// Airline admission errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Airline already known: {airline}")]
    DuplicateAirline { airline: AccountId },

    #[error("Airline not found: {airline}")]
    UnknownAirline { airline: AccountId },

    #[error("Airline {airline} is {state}, operation not allowed")]
    InvalidAirlineState {
        airline: AccountId,
        state: AirlineState,
    },

    #[error("{voter} already voted for {candidate}")]
    DuplicateVote {
        voter: AccountId,
        candidate: AccountId,
    },

    #[error("First airline already bootstrapped")]
    AlreadyBootstrapped,
}

/// Flight, policy and funds errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, provided {provided}")]
    InsufficientFunds { required: Decimal, provided: Decimal },

    #[error("Stake must be exact: required {required}, provided {provided}")]
    ExcessPayment { required: Decimal, provided: Decimal },

    #[error("Flight already registered: {key}")]
    DuplicateFlight { key: FlightKey },

    #[error("Flight not found: {key}")]
    UnknownFlight { key: FlightKey },

    #[error("Flight {key} already settled")]
    FlightSettled { key: FlightKey },

    #[error("Premium {premium} outside (0, {cap}]")]
    InvalidPremium { premium: Decimal, cap: Decimal },

    #[error("{passenger} already holds an open policy on {key}")]
    DuplicatePolicy { passenger: AccountId, key: FlightKey },

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),
}

/// Oracle protocol errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle already registered: {oracle}")]
    AlreadyRegistered { oracle: AccountId },

    #[error("Registration fee too low: required {required}, provided {provided}")]
    InsufficientFee { required: Decimal, provided: Decimal },

    #[error("Oracle {oracle} does not hold index {index}")]
    IndexMismatch { oracle: AccountId, index: u8 },

    #[error("No open status request for {key} at index {index}")]
    UnknownOrClosedRequest { key: FlightKey, index: u8 },

    #[error("Unrecognised flight status code: {0}")]
    InvalidStatusCode(u8),
}
