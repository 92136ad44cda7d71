//! Fleet cost and mileage accounting engine.
//!
//! The engine keeps the derived figures of a trucking fleet consistent
//! (lifetime miles, weekly cost totals, cost-per-mile, fuel cost and MPG,
//! per-load profit) whenever a truck, load or fuel purchase changes. Every
//! mutation goes through an [`Engine`] operation or hook, which runs the
//! matching recomputation pipeline under a per-truck lock and inside one
//! database transaction.

pub use cost::{CostLineItems, CostTotals, MileBasis, STANDARD_WEEKLY_MILES};
pub use cost_breakdowns::CostBreakdown;
pub use distance::{
    CityCoordinates, DEFAULT_CIRCUITY_FACTOR, DistanceError, DistanceResolver,
    GeoDistanceResolver,
};
pub use error::EngineError;
pub use fuel_purchases::{FuelPurchase, FuelType};
pub use loads::{Load, LoadStatus, Place};
pub use money::MoneyCents;
pub use ops::{
    DeadheadOutcome, Engine, EngineBuilder, FuelPurchaseUpdate, LoadProfitability, LoadUpdate,
    MutationKind, NewFuelPurchase, NewLoad, PipelineReport, TruckCostSummary, TruckRecompute,
};
pub use profitability::{FleetProfit, LoadProfit};
pub use trucks::Truck;
pub use week::{Clock, FixedClock, SystemClock, WeekWindow};

pub mod cost;
mod cost_breakdowns;
pub mod distance;
mod error;
mod fuel_purchases;
mod loads;
mod locks;
mod money;
mod ops;
pub mod profitability;
mod trucks;
mod util;
pub mod week;

type ResultEngine<T> = Result<T, EngineError>;
