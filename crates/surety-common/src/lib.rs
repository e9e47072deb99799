//! # Surety Common
//!
//! Shared types, errors, and notifications for the FlightSurety insurance engine.
//!
//! ## Core Types
//!
//! - [`AccountId`]: 20-byte identity for airlines, passengers, oracles and contracts
//! - [`Airline`]: registry entry with its lifecycle state and vote set
//! - [`Flight`]/[`FlightKey`]/[`FlightStatus`]: insured flights and their oracle-reported status
//! - [`InsurancePolicy`]: a passenger's premium, credit and withdrawal record
//! - [`SuretyEvent`]: notifications emitted on every committed state transition
//!
//! ## Errors
//!
//! - [`SuretyError`]: unified error with per-concern sub-enums
//! - [`ErrorKind`]: coarse classification shared with callers

pub mod error;
pub mod events;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    AccessError, ErrorKind, LedgerError, OracleError, RegistryError, Result, SuretyError,
};
pub use events::{EventEnvelope, SuretyEvent};
pub use types::{
    account_id::AccountId,
    airline::{Airline, AirlineState},
    flight::{Flight, FlightKey, FlightStatus},
    policy::{InsurancePolicy, PolicyId},
};

use rust_decimal::Decimal;

/// FlightSurety version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registered airlines below which a single funded airline may admit a newcomer
pub const BOOTSTRAP_AIRLINE_COUNT: usize = 4;

/// Stake an airline posts before it may participate (native units)
pub const AIRLINE_STAKE: Decimal = Decimal::TEN;

/// Maximum premium per policy (native units)
pub const PREMIUM_CAP: Decimal = Decimal::ONE;

/// Payout as a percentage of the premium for airline-caused delays
pub const PAYOUT_MULTIPLIER_PERCENT: u32 = 150;

/// Fee an oracle pays to receive its index set (native units)
pub const ORACLE_REGISTRATION_FEE: Decimal = Decimal::ONE;

/// Indexes assigned to every oracle
pub const ORACLE_INDEX_COUNT: usize = 3;

/// Indexes are drawn from `0..ORACLE_INDEX_SPACE`
pub const ORACLE_INDEX_SPACE: u8 = 10;

/// Matching reports required to resolve a status request
pub const MIN_ORACLE_RESPONSES: usize = 3;
