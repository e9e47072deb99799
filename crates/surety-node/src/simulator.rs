//! Simulated oracle processes
//!
//! Registers a fleet of oracles, then watches the event stream. Whenever a
//! status request opens, every simulated oracle holding its index answers,
//! with the configured status or a random one.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rust_decimal::Decimal;
use surety_app::{CallContext, SuretyHandle};
use surety_common::{AccountId, FlightKey, FlightStatus, SuretyEvent};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// A registered simulated oracle
#[derive(Debug, Clone)]
pub struct SimulatedOracle {
    pub id: AccountId,
    pub indexes: Vec<u8>,
}

/// In-process oracle fleet
pub struct OracleSimulator {
    handle: SuretyHandle,
    oracles: Vec<SimulatedOracle>,
    status: Option<FlightStatus>,
}

impl OracleSimulator {
    /// Register `count` oracles, paying `fee` each
    pub async fn register(
        handle: SuretyHandle,
        count: usize,
        fee: Decimal,
        status: Option<FlightStatus>,
    ) -> Result<Self> {
        let mut oracles = Vec::with_capacity(count);
        for n in 0..count {
            let id = AccountId::from_label(&format!("simulated-oracle-{}", n));
            let indexes = handle
                .register_oracle(CallContext::new(id).with_value(fee))
                .await?;
            debug!(oracle = %id, indexes = ?indexes, "Simulated oracle registered");
            oracles.push(SimulatedOracle { id, indexes });
        }

        info!(count, fixed_status = ?status, "Oracle simulator ready");
        Ok(Self {
            handle,
            oracles,
            status,
        })
    }

    pub fn oracles(&self) -> &[SimulatedOracle] {
        &self.oracles
    }

    /// Answer status requests from a background task
    ///
    /// Subscribes before returning, so requests opened afterwards are seen.
    pub fn spawn(self) -> JoinHandle<()> {
        let mut events = self.handle.event_stream();
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();

            while let Some(item) = events.next().await {
                match item {
                    Ok(envelope) => {
                        if let SuretyEvent::StatusRequestOpened { flight, index, .. } =
                            envelope.event
                        {
                            self.respond(&flight, index, &mut rng).await;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        warn!(missed, "Oracle simulator lagged behind the event stream");
                    }
                }
            }
            info!("Oracle simulator stopped");
        })
    }

    fn pick_status(&self, rng: &mut StdRng) -> FlightStatus {
        match self.status {
            Some(status) => status,
            None => FlightStatus::ALL
                .choose(rng)
                .copied()
                .unwrap_or(FlightStatus::Unknown),
        }
    }

    async fn respond(&self, flight: &FlightKey, index: u8, rng: &mut StdRng) {
        for oracle in self.oracles.iter().filter(|o| o.indexes.contains(&index)) {
            let status = self.pick_status(rng);
            let result = self
                .handle
                .submit_oracle_response(
                    CallContext::new(oracle.id),
                    flight.airline,
                    flight.code.clone(),
                    flight.timestamp,
                    index,
                    status.code(),
                )
                .await;

            match result {
                Ok(outcome) => {
                    debug!(oracle = %oracle.id, flight = %flight, status = %status, ?outcome, "Simulated response")
                }
                Err(err) => {
                    warn!(oracle = %oracle.id, flight = %flight, error = %err, "Simulated response rejected")
                }
            }
        }
    }
}
