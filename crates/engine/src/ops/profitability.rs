use chrono::NaiveDate;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    CostBreakdown, EngineError, Load, LoadStatus, MoneyCents, ResultEngine, Truck, loads,
    profitability::{self, FleetProfit, LoadProfit, TruckOperations},
    util::ensure_non_negative_miles,
};

use super::{Engine, with_tx};

/// Cost figures of one truck as of its latest pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TruckCostSummary {
    pub truck_id: Uuid,
    pub name: String,
    pub total_miles: i64,
    pub fixed_costs: MoneyCents,
    pub variable_costs: MoneyCents,
    pub weekly_costs: MoneyCents,
    pub cost_per_mile_minor: i64,
    /// Week the cache mirrors, if the truck has any breakdown.
    pub week_starting: Option<NaiveDate>,
    pub gallons_used: f64,
    pub avg_fuel_price_minor: i64,
    pub miles_per_gallon: f64,
    pub miles_this_week: i64,
    pub total_miles_with_deadhead: i64,
}

impl TruckCostSummary {
    fn new(truck: Truck, latest: Option<CostBreakdown>) -> Self {
        let mut summary = Self {
            truck_id: truck.id,
            name: truck.name,
            total_miles: truck.total_miles,
            fixed_costs: truck.fixed_costs,
            variable_costs: truck.variable_costs,
            weekly_costs: truck.fixed_costs + truck.variable_costs,
            cost_per_mile_minor: truck.cost_per_mile_minor,
            week_starting: None,
            gallons_used: 0.0,
            avg_fuel_price_minor: 0,
            miles_per_gallon: 0.0,
            miles_this_week: 0,
            total_miles_with_deadhead: 0,
        };
        if let Some(row) = latest {
            summary.week_starting = Some(row.week_starting);
            summary.gallons_used = row.gallons_used;
            summary.avg_fuel_price_minor = row.avg_fuel_price_minor;
            summary.miles_per_gallon = row.miles_per_gallon;
            summary.miles_this_week = row.miles_this_week;
            summary.total_miles_with_deadhead = row.total_miles_with_deadhead;
        }
        summary
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadProfitability {
    pub load_id: Uuid,
    pub truck_id: Option<Uuid>,
    pub status: LoadStatus,
    pub pay: MoneyCents,
    pub miles: i64,
    pub operational_miles: i64,
    pub rate_per_mile_minor: i64,
    pub cost_per_mile_minor: i64,
    pub net_profit: MoneyCents,
    pub profit_per_mile_minor: i64,
}

/// Derived columns of a load priced at `cost_per_mile_minor`.
pub(super) fn priced(load: &Load, cost_per_mile_minor: i64) -> ResultEngine<(LoadProfit, i64)> {
    Ok((
        profitability::for_trip(load.miles, load.pay, cost_per_mile_minor, 0)?,
        profitability::rate_per_mile_minor(load),
    ))
}

impl Engine {
    /// Writes profit, rate and cost-per-mile onto a load when they changed.
    pub(super) async fn write_load_profit(
        &self,
        db: &DatabaseTransaction,
        load: &Load,
        cost_per_mile_minor: i64,
    ) -> ResultEngine<bool> {
        let (profit, rate) = priced(load, cost_per_mile_minor)?;
        if load.profit == profit.net_profit
            && load.rate_per_mile_minor == rate
            && load.actual_cost_per_mile_minor == cost_per_mile_minor
        {
            return Ok(false);
        }
        loads::ActiveModel {
            id: ActiveValue::Set(load.id.to_string()),
            profit_minor: ActiveValue::Set(profit.net_profit.cents()),
            rate_per_mile_minor: ActiveValue::Set(rate),
            actual_cost_per_mile_minor: ActiveValue::Set(cost_per_mile_minor),
            ..Default::default()
        }
        .update(db)
        .await?;
        Ok(true)
    }

    /// Reprices every not-yet-delivered load of the truck with its current
    /// cost-per-mile. Delivered loads keep the figures frozen at delivery.
    pub(super) async fn refresh_load_profits(
        &self,
        db: &DatabaseTransaction,
        truck_id: Uuid,
    ) -> ResultEngine<usize> {
        let truck = self.require_truck(db, truck_id).await?;
        let mut written = 0;
        for load in self.loads_for_truck(db, truck_id).await? {
            if load.status != LoadStatus::Delivered
                && self
                    .write_load_profit(db, &load, truck.cost_per_mile_minor)
                    .await?
            {
                written += 1;
            }
        }
        debug!(%truck_id, written, "load profits refreshed");
        Ok(written)
    }

    pub async fn truck_cost_summary(&self, truck_id: Uuid) -> ResultEngine<TruckCostSummary> {
        with_tx!(self, |db_tx| {
            let truck = self.require_truck(&db_tx, truck_id).await?;
            let latest = self.latest_breakdown(&db_tx, truck_id).await?;
            Ok(TruckCostSummary::new(truck, latest))
        })
    }

    /// Profit of a load. Fuel is already a line item of the truck's weekly
    /// cost, so no separate fuel cost-per-mile is added.
    pub async fn load_profitability(&self, load_id: Uuid) -> ResultEngine<LoadProfitability> {
        with_tx!(self, |db_tx| {
            let load = self.require_load(&db_tx, load_id).await?;
            let cost_per_mile_minor = match (load.status, load.truck_id) {
                (LoadStatus::Delivered, _) => load.actual_cost_per_mile_minor,
                (_, Some(truck_id)) => {
                    self.require_truck(&db_tx, truck_id)
                        .await?
                        .cost_per_mile_minor
                }
                (_, None) => 0,
            };
            let (profit, rate) = priced(&load, cost_per_mile_minor)?;
            Ok(LoadProfitability {
                load_id: load.id,
                truck_id: load.truck_id,
                status: load.status,
                pay: load.pay,
                miles: load.miles,
                operational_miles: load.operational_miles(),
                rate_per_mile_minor: rate,
                cost_per_mile_minor: profit.total_cost_per_mile_minor,
                net_profit: profit.net_profit,
                profit_per_mile_minor: profit.profit_per_mile_minor,
            })
        })
    }

    /// Estimates a prospective load on `truck_id` without writing anything.
    pub async fn quote_load(
        &self,
        truck_id: Uuid,
        miles: i64,
        pay: MoneyCents,
        fuel_cost_per_mile_minor: i64,
    ) -> ResultEngine<LoadProfit> {
        ensure_non_negative_miles(miles, "miles")?;
        if fuel_cost_per_mile_minor < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "fuel cost per mile must be >= 0, got {fuel_cost_per_mile_minor}"
            )));
        }
        let truck = self.require_truck(&self.database, truck_id).await?;
        profitability::for_trip(
            miles,
            pay,
            truck.cost_per_mile_minor,
            fuel_cost_per_mile_minor,
        )
    }

    /// Fleet-wide profit over the delivered loads of the owner's trucks.
    pub async fn fleet_summary(&self, owner_id: &str) -> ResultEngine<FleetProfit> {
        with_tx!(self, |db_tx| {
            let mut operations = Vec::new();
            for truck in self.owner_trucks(&db_tx, owner_id).await? {
                let delivered = loads::Entity::find()
                    .filter(loads::Column::TruckId.eq(truck.id.to_string()))
                    .filter(loads::Column::Status.eq(LoadStatus::Delivered.as_str()))
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(Load::try_from)
                    .collect::<ResultEngine<Vec<_>>>()?;
                let mut revenue = MoneyCents::ZERO;
                let mut operational_miles = 0i64;
                for load in &delivered {
                    revenue = revenue.checked_add(load.pay).ok_or_else(|| {
                        EngineError::InvariantViolation(format!(
                            "truck {} revenue overflow",
                            truck.id
                        ))
                    })?;
                    operational_miles = operational_miles
                        .checked_add(load.operational_miles())
                        .ok_or_else(|| {
                            EngineError::InvariantViolation(format!(
                                "truck {} miles overflow",
                                truck.id
                            ))
                        })?;
                }
                operations.push(TruckOperations {
                    revenue,
                    operational_miles,
                    cost_per_mile_minor: truck.cost_per_mile_minor,
                });
            }
            profitability::fleet(operations)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::Place;

    #[test]
    fn priced_load_uses_rounded_cost_per_mile() {
        let load = Load {
            id: Uuid::new_v4(),
            truck_id: Some(Uuid::new_v4()),
            status: LoadStatus::Pending,
            miles: 500,
            deadhead_from: None,
            deadhead_miles: 0,
            deadhead_source: None,
            total_miles_with_deadhead: Some(500),
            pay: MoneyCents::new(120_000),
            origin: Place::new("Dallas", "TX"),
            destination: Place::new("Chicago", "IL"),
            rate_per_mile_minor: 0,
            profit: MoneyCents::ZERO,
            actual_cost_per_mile_minor: 0,
            pickup_at: None,
            created_at: Utc::now(),
            delivered_at: None,
        };
        let (profit, rate) = priced(&load, 150).unwrap();
        assert_eq!(rate, 240);
        assert_eq!(profit.net_profit, MoneyCents::new(45_000));
        assert_eq!(profit.profit_per_mile_minor, 90);
    }
}
