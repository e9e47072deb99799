//! Node configuration
//!
//! Layered, last wins: built-in defaults, `surety.toml` in the working
//! directory if present, then `SURETY__*` environment variables (with `__`
//! between nesting levels, e.g. `SURETY__LEDGER__PREMIUM_CAP=0.5`). A `.env`
//! file is read into the environment first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use surety_app::{AppConfig, DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY};
use surety_common::{AccountId, FlightStatus};
use surety_ledger::LedgerConfig;
use surety_oracle::OracleConfig;

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Endpoint advertised in the deployment manifest
    pub network_url: String,
    /// Where the deployment manifest is written
    pub manifest_path: PathBuf,
    /// Administrator identity (0x hex, or a label hashed into an identity)
    pub admin: String,
    /// Ledger identity
    pub data_account: String,
    /// App identity
    pub app_account: String,
    /// Airline seeded at startup
    pub first_airline: String,
    pub first_airline_name: String,
    /// Oracles registered and run in-process; 0 disables the simulator
    pub simulated_oracles: usize,
    /// Status code every simulated oracle reports; random when unset
    pub simulated_status: Option<u8>,
    pub command_capacity: usize,
    pub event_capacity: usize,
    pub ledger: LedgerConfig,
    pub oracle: OracleConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network_url: "http://127.0.0.1:8545".to_string(),
            manifest_path: PathBuf::from("deployment.json"),
            admin: "admin".to_string(),
            data_account: "flight-surety-data".to_string(),
            app_account: "flight-surety-app".to_string(),
            first_airline: "first-airline".to_string(),
            first_airline_name: "JetFirst Airlines".to_string(),
            simulated_oracles: 20,
            simulated_status: None,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            ledger: LedgerConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from `.env`, `surety.toml` and the environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name("surety").required(false))
            .add_source(
                ::config::Environment::with_prefix("SURETY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("reading configuration")?;

        let cfg: Self = settings
            .try_deserialize()
            .context("parsing configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;
        self.oracle.validate()?;
        if let Some(code) = self.simulated_status {
            FlightStatus::try_from(code)?;
        }
        Ok(())
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            ledger: self.ledger.clone(),
            oracle: self.oracle.clone(),
            command_capacity: self.command_capacity,
            event_capacity: self.event_capacity,
        }
    }

    pub fn admin_account(&self) -> Result<AccountId> {
        parse_account(&self.admin)
    }

    pub fn data_account(&self) -> Result<AccountId> {
        parse_account(&self.data_account)
    }

    pub fn app_account(&self) -> Result<AccountId> {
        parse_account(&self.app_account)
    }

    pub fn first_airline_account(&self) -> Result<AccountId> {
        parse_account(&self.first_airline)
    }

    pub fn simulated_status(&self) -> Option<FlightStatus> {
        self.simulated_status
            .and_then(|code| FlightStatus::try_from(code).ok())
    }
}

/// `0x`-prefixed values are parsed as hex, anything else is a label
pub fn parse_account(value: &str) -> Result<AccountId> {
    if value.starts_with("0x") {
        value
            .parse()
            .with_context(|| format!("invalid identity {}", value))
    } else {
        Ok(AccountId::from_label(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = NodeConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.app_config().oracle.min_responses, 3);
        assert!(cfg.simulated_status().is_none());
    }

    #[test]
    fn test_parse_account() {
        let id = AccountId::from_label("admin");
        assert_eq!(parse_account("admin").unwrap(), id);
        assert_eq!(parse_account(&id.to_string()).unwrap(), id);
        assert!(parse_account("0x1234").is_err());
    }

    #[test]
    fn test_invalid_simulated_status() {
        let cfg = NodeConfig {
            simulated_status: Some(15),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = NodeConfig {
            simulated_status: Some(20),
            ..Default::default()
        };
        assert_eq!(cfg.simulated_status(), Some(FlightStatus::LateAirline));
    }
}
