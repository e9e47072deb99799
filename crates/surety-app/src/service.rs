//! Single-writer service
//!
//! [`SuretyService::spawn`] moves the app onto one tokio task that drains a
//! bounded command queue. Every call, read or write, is answered over a
//! oneshot channel in queue order, so callers observe a prefix of one total
//! order without any locking around the state.

use crate::app::FlightSuretyApp;
use crate::context::CallContext;
use rust_decimal::Decimal;
use surety_common::{
    AccountId, AirlineState, EventEnvelope, FlightKey, InsurancePolicy, Result, SuretyError,
};
use surety_ledger::{CreditSummary, RegistrationOutcome};
use surety_oracle::{RequestKey, ResponseOutcome};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

type Reply<T> = oneshot::Sender<Result<T>>;

type ReadFn = Box<dyn FnOnce(&FlightSuretyApp) + Send>;

/// Calls accepted by the service task
enum Command {
    SetOperatingStatus {
        ctx: CallContext,
        operational: bool,
        reply: Reply<()>,
    },
    AuthorizeCaller {
        ctx: CallContext,
        contract: AccountId,
        reply: Reply<()>,
    },
    DeauthorizeCaller {
        ctx: CallContext,
        contract: AccountId,
        reply: Reply<()>,
    },
    BootstrapAirline {
        ctx: CallContext,
        airline: AccountId,
        name: String,
        reply: Reply<()>,
    },
    AddAirline {
        ctx: CallContext,
        airline: AccountId,
        name: String,
        reply: Reply<()>,
    },
    RegisterAirline {
        ctx: CallContext,
        candidate: AccountId,
        reply: Reply<RegistrationOutcome>,
    },
    SubmitFunds {
        ctx: CallContext,
        reply: Reply<AirlineState>,
    },
    RegisterFlight {
        ctx: CallContext,
        airline: AccountId,
        code: String,
        timestamp: i64,
        reply: Reply<FlightKey>,
    },
    BuyInsurance {
        ctx: CallContext,
        airline: AccountId,
        code: String,
        timestamp: Option<i64>,
        reply: Reply<InsurancePolicy>,
    },
    CreditInsurees {
        ctx: CallContext,
        flight: FlightKey,
        multiplier_percent: u32,
        reply: Reply<CreditSummary>,
    },
    WithdrawFunds {
        ctx: CallContext,
        reply: Reply<Decimal>,
    },
    RegisterOracle {
        ctx: CallContext,
        reply: Reply<Vec<u8>>,
    },
    FetchFlightStatus {
        ctx: CallContext,
        airline: AccountId,
        code: String,
        timestamp: i64,
        reply: Reply<RequestKey>,
    },
    SubmitOracleResponse {
        ctx: CallContext,
        airline: AccountId,
        code: String,
        timestamp: i64,
        index: u8,
        status_code: u8,
        reply: Reply<ResponseOutcome>,
    },
    Read(ReadFn),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::SetOperatingStatus { .. } => "set_operating_status",
            Command::AuthorizeCaller { .. } => "authorize_caller",
            Command::DeauthorizeCaller { .. } => "deauthorize_caller",
            Command::BootstrapAirline { .. } => "bootstrap_airline",
            Command::AddAirline { .. } => "add_airline",
            Command::RegisterAirline { .. } => "register_airline",
            Command::SubmitFunds { .. } => "submit_airline_registration_fund",
            Command::RegisterFlight { .. } => "register_flight",
            Command::BuyInsurance { .. } => "buy_insurance",
            Command::CreditInsurees { .. } => "credit_insurees",
            Command::WithdrawFunds { .. } => "withdraw_funds",
            Command::RegisterOracle { .. } => "register_oracle",
            Command::FetchFlightStatus { .. } => "fetch_flight_status",
            Command::SubmitOracleResponse { .. } => "submit_oracle_response",
            Command::Read(_) => "read",
        }
    }
}

/// Spawns the app on its own task
pub struct SuretyService;

impl SuretyService {
    /// Start serving `app` with its configured queue depth; the task ends
    /// once every handle is dropped
    pub fn spawn(app: FlightSuretyApp) -> SuretyHandle {
        let capacity = app.command_capacity();
        let (commands, rx) = mpsc::channel(capacity);
        let events = app.event_sender();
        let app_id = *app.id();

        tokio::spawn(run(app, rx));
        info!(app = %app_id, capacity, "Surety service started");

        SuretyHandle {
            app_id,
            commands,
            events,
        }
    }
}

async fn run(mut app: FlightSuretyApp, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        debug!(command = command.name(), "Dispatching");
        dispatch(&mut app, command);
    }
    info!(app = %app.id(), height = app.chain_head().height(), "Surety service stopped");
}

// A dropped reply receiver means the caller gave up; the call still committed
fn dispatch(app: &mut FlightSuretyApp, command: Command) {
    match command {
        Command::SetOperatingStatus {
            ctx,
            operational,
            reply,
        } => {
            let _ = reply.send(app.set_operating_status(&ctx, operational));
        }
        Command::AuthorizeCaller {
            ctx,
            contract,
            reply,
        } => {
            let _ = reply.send(app.authorize_caller(&ctx, contract));
        }
        Command::DeauthorizeCaller {
            ctx,
            contract,
            reply,
        } => {
            let _ = reply.send(app.deauthorize_caller(&ctx, contract));
        }
        Command::BootstrapAirline {
            ctx,
            airline,
            name,
            reply,
        } => {
            let _ = reply.send(app.bootstrap_airline(&ctx, airline, &name));
        }
        Command::AddAirline {
            ctx,
            airline,
            name,
            reply,
        } => {
            let _ = reply.send(app.add_airline(&ctx, airline, &name));
        }
        Command::RegisterAirline {
            ctx,
            candidate,
            reply,
        } => {
            let _ = reply.send(app.register_airline(&ctx, candidate));
        }
        Command::SubmitFunds { ctx, reply } => {
            let _ = reply.send(app.submit_airline_registration_fund(&ctx));
        }
        Command::RegisterFlight {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        } => {
            let _ = reply.send(app.register_flight(&ctx, airline, &code, timestamp));
        }
        Command::BuyInsurance {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        } => {
            let _ = reply.send(app.buy_insurance(&ctx, airline, &code, timestamp));
        }
        Command::CreditInsurees {
            ctx,
            flight,
            multiplier_percent,
            reply,
        } => {
            let _ = reply.send(app.credit_insurees(&ctx, &flight, multiplier_percent));
        }
        Command::WithdrawFunds { ctx, reply } => {
            let _ = reply.send(app.withdraw_funds(&ctx));
        }
        Command::RegisterOracle { ctx, reply } => {
            let _ = reply.send(app.register_oracle(&ctx));
        }
        Command::FetchFlightStatus {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        } => {
            let _ = reply.send(app.fetch_flight_status(&ctx, airline, &code, timestamp));
        }
        Command::SubmitOracleResponse {
            ctx,
            airline,
            code,
            timestamp,
            index,
            status_code,
            reply,
        } => {
            let _ = reply.send(app.submit_oracle_response(
                &ctx,
                airline,
                &code,
                timestamp,
                index,
                status_code,
            ));
        }
        Command::Read(read) => read(&*app),
    }
}

fn unavailable(what: &str) -> SuretyError {
    SuretyError::Unavailable(format!("surety service {}", what))
}

/// Cloneable async client of a running [`SuretyService`]
#[derive(Clone)]
pub struct SuretyHandle {
    app_id: AccountId,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EventEnvelope>,
}

impl SuretyHandle {
    /// Identity of the served app
    pub fn app_id(&self) -> &AccountId {
        &self.app_id
    }

    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| unavailable("stopped"))?;
        rx.await.map_err(|_| unavailable("dropped the call"))?
    }

    /// Run `f` against the app between two queued calls
    pub async fn read<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&FlightSuretyApp) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let read: ReadFn = Box::new(move |app: &FlightSuretyApp| {
            let _ = reply.send(f(app));
        });
        self.commands
            .send(Command::Read(read))
            .await
            .map_err(|_| unavailable("stopped"))?;
        rx.await.map_err(|_| unavailable("dropped the call"))
    }

    /// Events committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// [`subscribe`](Self::subscribe) as a stream; lagging yields an error item
    pub fn event_stream(&self) -> BroadcastStream<EventEnvelope> {
        BroadcastStream::new(self.events.subscribe())
    }

    // ============ ENTRY POINTS ============

    pub async fn set_operating_status(&self, ctx: CallContext, operational: bool) -> Result<()> {
        self.call(|reply| Command::SetOperatingStatus {
            ctx,
            operational,
            reply,
        })
        .await
    }

    pub async fn authorize_caller(&self, ctx: CallContext, contract: AccountId) -> Result<()> {
        self.call(|reply| Command::AuthorizeCaller {
            ctx,
            contract,
            reply,
        })
        .await
    }

    pub async fn deauthorize_caller(&self, ctx: CallContext, contract: AccountId) -> Result<()> {
        self.call(|reply| Command::DeauthorizeCaller {
            ctx,
            contract,
            reply,
        })
        .await
    }

    pub async fn bootstrap_airline(
        &self,
        ctx: CallContext,
        airline: AccountId,
        name: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        self.call(|reply| Command::BootstrapAirline {
            ctx,
            airline,
            name,
            reply,
        })
        .await
    }

    pub async fn add_airline(
        &self,
        ctx: CallContext,
        airline: AccountId,
        name: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        self.call(|reply| Command::AddAirline {
            ctx,
            airline,
            name,
            reply,
        })
        .await
    }

    pub async fn register_airline(
        &self,
        ctx: CallContext,
        candidate: AccountId,
    ) -> Result<RegistrationOutcome> {
        self.call(|reply| Command::RegisterAirline {
            ctx,
            candidate,
            reply,
        })
        .await
    }

    pub async fn submit_airline_registration_fund(&self, ctx: CallContext) -> Result<AirlineState> {
        self.call(|reply| Command::SubmitFunds { ctx, reply }).await
    }

    pub async fn register_flight(
        &self,
        ctx: CallContext,
        airline: AccountId,
        code: impl Into<String>,
        timestamp: i64,
    ) -> Result<FlightKey> {
        let code = code.into();
        self.call(|reply| Command::RegisterFlight {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        })
        .await
    }

    pub async fn buy_insurance(
        &self,
        ctx: CallContext,
        airline: AccountId,
        code: impl Into<String>,
        timestamp: Option<i64>,
    ) -> Result<InsurancePolicy> {
        let code = code.into();
        self.call(|reply| Command::BuyInsurance {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        })
        .await
    }

    pub async fn credit_insurees(
        &self,
        ctx: CallContext,
        flight: FlightKey,
        multiplier_percent: u32,
    ) -> Result<CreditSummary> {
        self.call(|reply| Command::CreditInsurees {
            ctx,
            flight,
            multiplier_percent,
            reply,
        })
        .await
    }

    pub async fn withdraw_funds(&self, ctx: CallContext) -> Result<Decimal> {
        self.call(|reply| Command::WithdrawFunds { ctx, reply }).await
    }

    pub async fn register_oracle(&self, ctx: CallContext) -> Result<Vec<u8>> {
        self.call(|reply| Command::RegisterOracle { ctx, reply }).await
    }

    pub async fn fetch_flight_status(
        &self,
        ctx: CallContext,
        airline: AccountId,
        code: impl Into<String>,
        timestamp: i64,
    ) -> Result<RequestKey> {
        let code = code.into();
        self.call(|reply| Command::FetchFlightStatus {
            ctx,
            airline,
            code,
            timestamp,
            reply,
        })
        .await
    }

    pub async fn submit_oracle_response(
        &self,
        ctx: CallContext,
        airline: AccountId,
        code: impl Into<String>,
        timestamp: i64,
        index: u8,
        status_code: u8,
    ) -> Result<ResponseOutcome> {
        let code = code.into();
        self.call(|reply| Command::SubmitOracleResponse {
            ctx,
            airline,
            code,
            timestamp,
            index,
            status_code,
            reply,
        })
        .await
    }

    // ============ QUERIES ============

    pub async fn is_operational(&self) -> Result<bool> {
        self.read(|app| app.is_operational()).await
    }

    pub async fn is_airline_registered(&self, airline: AccountId) -> Result<bool> {
        self.read(move |app| app.is_airline_registered(&airline)).await
    }

    pub async fn is_airline_funded(&self, airline: AccountId) -> Result<bool> {
        self.read(move |app| app.is_airline_funded(&airline)).await
    }

    pub async fn owed_to(&self, passenger: AccountId) -> Result<Decimal> {
        self.read(move |app| app.owed_to(&passenger)).await
    }

    pub async fn oracle_indexes(&self, oracle: AccountId) -> Result<Option<Vec<u8>>> {
        self.read(move |app| app.oracle_indexes(&oracle)).await
    }
}
