//! # Surety App
//!
//! The callable surface of FlightSurety.
//!
//! [`FlightSuretyApp`] composes the ledger and the oracle consensus behind
//! one entry point per operation, takes the caller identity and attached
//! value from a [`CallContext`], and emits a [`SuretyEvent`] for every
//! committed state transition.
//!
//! [`SuretyService`] runs the app on a single tokio task: calls queue on a
//! bounded channel and execute one at a time in arrival order.
//!
//! [`SuretyEvent`]: surety_common::SuretyEvent

pub mod app;
pub mod context;
pub mod deployment;
pub mod service;

pub use app::FlightSuretyApp;
pub use context::CallContext;
pub use deployment::DeploymentManifest;
pub use service::{SuretyHandle, SuretyService};

use serde::{Deserialize, Serialize};
use surety_ledger::LedgerConfig;
use surety_oracle::OracleConfig;

/// Default capacity of the command queue
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Default capacity of the event broadcast buffer
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub oracle: OracleConfig,
    /// Pending calls before senders wait
    pub command_capacity: usize,
    /// Events retained for slow subscribers
    pub event_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            oracle: OracleConfig::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
