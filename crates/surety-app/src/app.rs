//! FlightSuretyApp - the application facade
//!
//! Every entry point runs to completion against the owned state. A call that
//! succeeds is committed to the ledger chain head and its events broadcast;
//! a call that fails leaves no state change and emits nothing.

use crate::context::CallContext;
use crate::AppConfig;
use rust_decimal::Decimal;
use surety_common::{
    AccountId, Airline, AirlineState, EventEnvelope, Flight, FlightKey, FlightStatus,
    InsurancePolicy, PolicyId, Result, SuretyError, SuretyEvent,
};
use surety_ledger::{
    ChainHead, CreditSummary, PayoutRail, RegistrationOutcome, SuretyLedger, Treasury,
};
use surety_oracle::{OracleConsensus, RequestKey, ResponseOutcome};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

fn log_rejection(operation: &'static str, ctx: &CallContext, err: &SuretyError) {
    warn!(
        operation,
        caller = %ctx.caller,
        kind = ?err.kind(),
        error = %err,
        "Call rejected"
    );
}

/// Application facade over the ledger and oracle consensus
pub struct FlightSuretyApp {
    id: AccountId,
    ledger: SuretyLedger,
    oracles: OracleConsensus,
    rail: Box<dyn PayoutRail>,
    events: broadcast::Sender<EventEnvelope>,
    command_capacity: usize,
}

impl FlightSuretyApp {
    /// Deploy a new app
    ///
    /// `id` is the app's own identity, authorized on the ledger by `admin`
    /// so oracle consensus may settle flights and credit insurees.
    pub fn new(
        id: AccountId,
        data_id: AccountId,
        admin: AccountId,
        config: AppConfig,
        rail: Box<dyn PayoutRail>,
    ) -> Result<Self> {
        let mut ledger = SuretyLedger::new(data_id, admin, config.ledger)?;
        ledger.authorize_caller(&admin, id)?;
        let oracles = OracleConsensus::new(id, config.oracle)?;
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        info!(app = %id, data = %data_id, admin = %admin, "FlightSurety app deployed");
        Ok(Self {
            id,
            ledger,
            oracles,
            rail,
            events,
            command_capacity: config.command_capacity.max(1),
        })
    }

    /// Commit a successful call and broadcast its events
    ///
    /// The chain head only advances over the encoded events.
    fn commit(&mut self, events: Vec<SuretyEvent>) -> Result<u64> {
        let payload =
            serde_json::to_vec(&events).map_err(|err| SuretyError::Encoding(err.to_string()))?;
        let height = self.ledger.commit(&payload);

        for event in events {
            info!(height, event = event.name(), "Event emitted");
            // No subscribers is not an error
            let _ = self.events.send(EventEnvelope::new(height, event));
        }
        Ok(height)
    }

    fn finish<T>(
        &mut self,
        operation: &'static str,
        ctx: &CallContext,
        result: Result<(T, Vec<SuretyEvent>)>,
    ) -> Result<T> {
        match result {
            Ok((value, events)) => match self.commit(events) {
                Ok(_) => Ok(value),
                Err(err) => {
                    error!(operation, error = %err, "Commit failed");
                    Err(err)
                }
            },
            Err(err) => {
                log_rejection(operation, ctx, &err);
                Err(err)
            }
        }
    }

    // ============ OPERATIONAL SWITCH ============

    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn set_operating_status(&mut self, ctx: &CallContext, operational: bool) -> Result<()> {
        let result = self
            .ledger
            .set_operational(&ctx.caller, operational)
            .map(|changed| {
                let events = if changed {
                    vec![SuretyEvent::OperationalStatusChanged { operational }]
                } else {
                    Vec::new()
                };
                ((), events)
            });
        self.finish("set_operating_status", ctx, result)
    }

    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn authorize_caller(&mut self, ctx: &CallContext, contract: AccountId) -> Result<()> {
        let result = self
            .ledger
            .authorize_caller(&ctx.caller, contract)
            .map(|added| {
                let events = if added {
                    vec![SuretyEvent::CallerAuthorized { caller: contract }]
                } else {
                    Vec::new()
                };
                ((), events)
            });
        self.finish("authorize_caller", ctx, result)
    }

    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn deauthorize_caller(&mut self, ctx: &CallContext, contract: AccountId) -> Result<()> {
        let result = self
            .ledger
            .deauthorize_caller(&ctx.caller, &contract)
            .map(|removed| {
                let events = if removed {
                    vec![SuretyEvent::CallerDeauthorized { caller: contract }]
                } else {
                    Vec::new()
                };
                ((), events)
            });
        self.finish("deauthorize_caller", ctx, result)
    }

    // ============ AIRLINES ============

    /// Seed the first airline as Registered
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn bootstrap_airline(
        &mut self,
        ctx: &CallContext,
        airline: AccountId,
        name: &str,
    ) -> Result<()> {
        let result = self
            .ledger
            .bootstrap_airline(&ctx.caller, airline, name)
            .map(|()| {
                (
                    (),
                    vec![
                        SuretyEvent::AirlineAdded {
                            airline,
                            name: name.to_string(),
                            proposed_by: None,
                        },
                        SuretyEvent::AirlineRegistered { airline, votes: 0 },
                    ],
                )
            });
        self.finish("bootstrap_airline", ctx, result)
    }

    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn add_airline(&mut self, ctx: &CallContext, airline: AccountId, name: &str) -> Result<()> {
        let result = self
            .ledger
            .add_airline(&ctx.caller, airline, name)
            .map(|()| {
                (
                    (),
                    vec![SuretyEvent::AirlineAdded {
                        airline,
                        name: name.to_string(),
                        proposed_by: Some(ctx.caller),
                    }],
                )
            });
        self.finish("add_airline", ctx, result)
    }

    /// Vote for an Added airline
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn register_airline(
        &mut self,
        ctx: &CallContext,
        candidate: AccountId,
    ) -> Result<RegistrationOutcome> {
        let result = self
            .ledger
            .register_airline(&ctx.caller, &candidate)
            .map(|outcome| {
                let event = match outcome {
                    RegistrationOutcome::Registered { votes } => SuretyEvent::AirlineRegistered {
                        airline: candidate,
                        votes,
                    },
                    RegistrationOutcome::Pending { votes, required } => SuretyEvent::AirlineVoted {
                        candidate,
                        voter: ctx.caller,
                        votes,
                        required,
                    },
                };
                (outcome, vec![event])
            });
        self.finish("register_airline", ctx, result)
    }

    /// Post the airline stake attached to the call
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller, value = %ctx.value))]
    pub fn submit_airline_registration_fund(&mut self, ctx: &CallContext) -> Result<AirlineState> {
        let result = self
            .ledger
            .submit_airline_registration_fund(&ctx.caller, ctx.value)
            .map(|state| {
                (
                    state,
                    vec![SuretyEvent::FundsSubmitted {
                        airline: ctx.caller,
                        amount: ctx.value,
                    }],
                )
            });
        self.finish("submit_airline_registration_fund", ctx, result)
    }

    // ============ INSURANCE ============

    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn register_flight(
        &mut self,
        ctx: &CallContext,
        airline: AccountId,
        code: &str,
        timestamp: i64,
    ) -> Result<FlightKey> {
        let result = self
            .ledger
            .register_flight(&ctx.caller, &airline, code, timestamp)
            .map(|flight| {
                let events = vec![SuretyEvent::FlightRegistered {
                    flight: flight.clone(),
                }];
                (flight, events)
            });
        self.finish("register_flight", ctx, result)
    }

    /// Buy cover with the premium attached to the call
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller, value = %ctx.value))]
    pub fn buy_insurance(
        &mut self,
        ctx: &CallContext,
        airline: AccountId,
        code: &str,
        timestamp: Option<i64>,
    ) -> Result<InsurancePolicy> {
        let result = self
            .ledger
            .buy_insurance(&ctx.caller, &airline, code, timestamp, ctx.value)
            .map(|policy| {
                let events = vec![SuretyEvent::InsurancePurchased {
                    policy_id: policy.id,
                    passenger: policy.passenger,
                    flight: policy.flight.clone(),
                    premium: policy.premium,
                }];
                (policy, events)
            });
        self.finish("buy_insurance", ctx, result)
    }

    /// Direct crediting; only authorized callers get past the ledger
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn credit_insurees(
        &mut self,
        ctx: &CallContext,
        flight: &FlightKey,
        multiplier_percent: u32,
    ) -> Result<CreditSummary> {
        let result = self
            .ledger
            .credit_insurees(&ctx.caller, flight, multiplier_percent)
            .map(|summary| {
                let events = credited_events(&summary);
                (summary, events)
            });
        self.finish("credit_insurees", ctx, result)
    }

    /// Pay the caller everything owed
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn withdraw_funds(&mut self, ctx: &CallContext) -> Result<Decimal> {
        let result = self
            .ledger
            .withdraw_funds(&ctx.caller, self.rail.as_mut())
            .map(|amount| {
                (
                    amount,
                    vec![SuretyEvent::FundsWithdrawn {
                        passenger: ctx.caller,
                        amount,
                    }],
                )
            });
        self.finish("withdraw_funds", ctx, result)
    }

    // ============ ORACLES ============

    /// Register the caller as an oracle with the fee attached to the call
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller, value = %ctx.value))]
    pub fn register_oracle(&mut self, ctx: &CallContext) -> Result<Vec<u8>> {
        let result = self
            .oracles
            .register_oracle(&mut self.ledger, &ctx.caller, ctx.value)
            .map(|indexes| {
                let events = vec![SuretyEvent::OracleRegistered {
                    oracle: ctx.caller,
                    indexes: indexes.clone(),
                }];
                (indexes, events)
            });
        self.finish("register_oracle", ctx, result)
    }

    /// Ask oracles holding a freshly drawn index to report on a flight
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn fetch_flight_status(
        &mut self,
        ctx: &CallContext,
        airline: AccountId,
        code: &str,
        timestamp: i64,
    ) -> Result<RequestKey> {
        let result = self
            .oracles
            .fetch_flight_status(&self.ledger, &ctx.caller, &airline, code, timestamp)
            .map(|key| {
                let events = vec![SuretyEvent::StatusRequestOpened {
                    flight: key.flight.clone(),
                    index: key.index,
                    requester: ctx.caller,
                }];
                (key, events)
            });
        self.finish("fetch_flight_status", ctx, result)
    }

    /// Accept an oracle report given as a wire status code
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller))]
    pub fn submit_oracle_response(
        &mut self,
        ctx: &CallContext,
        airline: AccountId,
        code: &str,
        timestamp: i64,
        index: u8,
        status_code: u8,
    ) -> Result<ResponseOutcome> {
        let result = FlightStatus::try_from(status_code)
            .map_err(SuretyError::from)
            .and_then(|status| {
                self.oracles.submit_oracle_response(
                    &mut self.ledger,
                    &ctx.caller,
                    &airline,
                    code,
                    timestamp,
                    index,
                    status,
                )
            })
            .map(|outcome| {
                let flight = FlightKey::new(airline, code, timestamp);
                let events = response_events(&outcome, flight, index, ctx.caller);
                (outcome, events)
            });

        // Ignored responses change nothing and are not committed
        match result {
            Ok((ResponseOutcome::Ignored, _)) => Ok(ResponseOutcome::Ignored),
            other => self.finish("submit_oracle_response", ctx, other),
        }
    }

    // ============ QUERIES ============

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn data_id(&self) -> &AccountId {
        self.ledger.id()
    }

    pub fn ledger(&self) -> &SuretyLedger {
        &self.ledger
    }

    pub fn oracles(&self) -> &OracleConsensus {
        &self.oracles
    }

    pub fn is_operational(&self) -> bool {
        self.ledger.is_operational()
    }

    pub fn airline(&self, airline: &AccountId) -> Option<&Airline> {
        self.ledger.airline(airline)
    }

    pub fn is_airline_registered(&self, airline: &AccountId) -> bool {
        self.ledger.is_airline_registered(airline)
    }

    pub fn is_airline_funded(&self, airline: &AccountId) -> bool {
        self.ledger.is_airline_funded(airline)
    }

    pub fn registered_airline_count(&self) -> usize {
        self.ledger.registered_airline_count()
    }

    pub fn flight(&self, flight: &FlightKey) -> Option<&Flight> {
        self.ledger.flight(flight)
    }

    pub fn policy(&self, id: PolicyId) -> Option<&InsurancePolicy> {
        self.ledger.policy(id)
    }

    pub fn policies_of(&self, passenger: &AccountId) -> Vec<&InsurancePolicy> {
        self.ledger.policies_of(passenger)
    }

    /// Credited, unwithdrawn payouts owed to `passenger`
    pub fn owed_to(&self, passenger: &AccountId) -> Decimal {
        self.ledger.owed_to(passenger)
    }

    pub fn treasury(&self) -> &Treasury {
        self.ledger.treasury()
    }

    pub fn oracle_indexes(&self, oracle: &AccountId) -> Option<Vec<u8>> {
        self.oracles.oracle_indexes(oracle).map(<[u8]>::to_vec)
    }

    /// Queue depth the service gives this app
    pub fn command_capacity(&self) -> usize {
        self.command_capacity
    }

    pub fn chain_head(&self) -> ChainHead {
        *self.ledger.chain()
    }

    /// Receive events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<EventEnvelope> {
        self.events.clone()
    }
}

fn credited_events(summary: &CreditSummary) -> Vec<SuretyEvent> {
    if summary.policies == 0 {
        return Vec::new();
    }
    vec![SuretyEvent::FundsCredited {
        flight: summary.flight.clone(),
        policies: summary.policies,
        total: summary.total,
    }]
}

fn response_events(
    outcome: &ResponseOutcome,
    flight: FlightKey,
    index: u8,
    oracle: AccountId,
) -> Vec<SuretyEvent> {
    match outcome {
        ResponseOutcome::Ignored => Vec::new(),
        ResponseOutcome::Recorded { status, .. } => vec![SuretyEvent::OracleReported {
            flight,
            index,
            oracle,
            status: *status,
        }],
        ResponseOutcome::Resolved { status, credited } => {
            let mut events = vec![
                SuretyEvent::OracleReported {
                    flight: flight.clone(),
                    index,
                    oracle,
                    status: *status,
                },
                SuretyEvent::StatusResolved {
                    flight,
                    index,
                    status: *status,
                },
            ];
            if let Some(summary) = credited {
                events.extend(credited_events(summary));
            }
            events
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surety_common::ErrorKind;
    use surety_ledger::SharedRail;

    fn app() -> (FlightSuretyApp, AccountId) {
        let admin = AccountId::from_label("admin");
        let app = FlightSuretyApp::new(
            AccountId::from_label("app"),
            AccountId::from_label("data"),
            admin,
            AppConfig::default(),
            Box::new(SharedRail::new()),
        )
        .unwrap();
        (app, admin)
    }

    #[test]
    fn test_app_identity_is_authorized() {
        let (app, _) = app();
        assert!(app.ledger().is_authorized(app.id()));
        assert_eq!(app.chain_head().height(), 0);
        assert_eq!(app.command_capacity(), crate::DEFAULT_COMMAND_CAPACITY);
    }

    #[test]
    fn test_success_commits_and_emits() {
        let (mut app, admin) = app();
        let mut rx = app.subscribe();
        let airline = AccountId::from_label("airline");

        app.bootstrap_airline(&CallContext::new(admin), airline, "JetFirst Airlines")
            .unwrap();
        assert_eq!(app.chain_head().height(), 1);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.height, 1);
        assert!(matches!(first.event, SuretyEvent::AirlineAdded { .. }));
        let second = rx.try_recv().unwrap();
        assert!(matches!(
            second.event,
            SuretyEvent::AirlineRegistered { votes: 0, .. }
        ));
    }

    #[test]
    fn test_chain_head_folds_encoded_events() {
        let (mut app, admin) = app();
        let mut rx = app.subscribe();

        app.bootstrap_airline(
            &CallContext::new(admin),
            AccountId::from_label("airline"),
            "JetFirst Airlines",
        )
        .unwrap();

        let events: Vec<SuretyEvent> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|envelope| envelope.event)
            .collect();
        assert_eq!(events.len(), 2);

        let mut expected = ChainHead::genesis();
        expected.advance(&serde_json::to_vec(&events).unwrap());
        assert_eq!(app.chain_head(), expected);

        let mut empty = ChainHead::genesis();
        empty.advance(&[]);
        assert_ne!(app.chain_head(), empty);
    }

    #[test]
    fn test_failure_emits_nothing() {
        let (mut app, _) = app();
        let mut rx = app.subscribe();
        let stranger = AccountId::from_label("stranger");

        let err = app
            .set_operating_status(&CallContext::new(stranger), false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(rx.try_recv().is_err());
        assert_eq!(app.chain_head().height(), 0);
    }

    #[test]
    fn test_invalid_status_code() {
        let (mut app, _) = app();
        let err = app
            .submit_oracle_response(
                &CallContext::new(AccountId::from_label("oracle")),
                AccountId::from_label("airline"),
                "ABC-DEF-GHI",
                1,
                0,
                15,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OracleProtocol);
    }

    #[test]
    fn test_redundant_pause_emits_nothing() {
        let (mut app, admin) = app();
        let mut rx = app.subscribe();
        app.set_operating_status(&CallContext::new(admin), true).unwrap();
        assert!(rx.try_recv().is_err());

        app.set_operating_status(&CallContext::new(admin), false).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap().event,
            SuretyEvent::OperationalStatusChanged { operational: false }
        ));
        assert!(!app.is_operational());
    }
}
