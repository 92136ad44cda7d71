use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::{
    DEFAULT_CIRCUITY_FACTOR, EngineError, GeoDistanceResolver, ResultEngine,
    distance::DistanceResolver,
    locks::TruckLocks,
    week::{Clock, SystemClock, WeekWindow},
};

mod access;
mod breakdowns;
mod deadhead;
mod fuel;
mod fuel_attribution;
mod loads;
mod mileage;
mod pipeline;
mod profitability;
mod trucks;

pub use deadhead::DeadheadOutcome;
pub use fuel::{FuelPurchaseUpdate, NewFuelPurchase};
pub use loads::{LoadUpdate, NewLoad};
pub use pipeline::{MutationKind, PipelineReport, TruckRecompute};
pub use profitability::{LoadProfitability, TruckCostSummary};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    distance: Arc<dyn DistanceResolver>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    distance_timeout: Duration,
    max_pipeline_attempts: u32,
    locks: TruckLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The accounting week containing the clock's "now".
    pub fn current_week(&self) -> WeekWindow {
        WeekWindow::containing(self.now(), self.timezone)
    }

    /// Runs `op` again while it fails on lock contention, up to the
    /// configured number of attempts.
    async fn retry_on_contention<T, F, Fut>(&self, label: &str, mut op: F) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(EngineError::ConcurrentRecomputation(reason))
                    if attempt < self.max_pipeline_attempts =>
                {
                    warn!(label, attempt, %reason, "truck busy, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    distance: Option<Arc<dyn DistanceResolver>>,
    clock: Option<Arc<dyn Clock>>,
    timezone: Tz,
    distance_timeout: Duration,
    lock_wait: Duration,
    max_pipeline_attempts: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            distance: None,
            clock: None,
            timezone: Tz::UTC,
            distance_timeout: Duration::from_secs(3),
            lock_wait: Duration::from_secs(5),
            max_pipeline_attempts: 3,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// City-to-city mileage source used for deadhead. Defaults to a
    /// coordinates table with no cities, so every lookup soft-fails.
    pub fn distance_resolver(mut self, resolver: Arc<dyn DistanceResolver>) -> EngineBuilder {
        self.distance = Some(resolver);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = Some(clock);
        self
    }

    /// Timezone the accounting week is computed in.
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    pub fn distance_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.distance_timeout = timeout;
        self
    }

    /// How long a pipeline waits for a busy truck before giving up.
    pub fn lock_wait(mut self, wait: Duration) -> EngineBuilder {
        self.lock_wait = wait;
        self
    }

    pub fn max_pipeline_attempts(mut self, attempts: u32) -> EngineBuilder {
        self.max_pipeline_attempts = attempts.max(1);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let distance = self.distance.unwrap_or_else(|| {
            Arc::new(GeoDistanceResolver::new(Vec::new(), DEFAULT_CIRCUITY_FACTOR))
        });
        Ok(Engine {
            database: self.database,
            distance,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            timezone: self.timezone,
            distance_timeout: self.distance_timeout,
            max_pipeline_attempts: self.max_pipeline_attempts,
            locks: TruckLocks::new(self.lock_wait),
        })
    }
}
