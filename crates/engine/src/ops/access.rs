use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    CostBreakdown, EngineError, FuelPurchase, Load, ResultEngine, Truck, cost_breakdowns,
    fuel_purchases, loads, trucks, week::WeekWindow,
};

use super::Engine;

/// Miles driven by a truck inside one accounting week.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct WeekMiles {
    pub revenue: i64,
    pub with_deadhead: i64,
}

/// Whether `load` belongs to the week: created or delivered inside it.
pub(super) fn load_in_week(load: &Load, week: &WeekWindow) -> bool {
    week.contains(load.created_at) || load.delivered_at.is_some_and(|at| week.contains(at))
}

impl Engine {
    pub(super) async fn require_truck<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
    ) -> ResultEngine<Truck> {
        let model = trucks::Entity::find_by_id(truck_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("truck not exists".to_string()))?;
        Truck::try_from(model)
    }

    pub(super) async fn find_load<C: ConnectionTrait>(
        &self,
        db: &C,
        load_id: Uuid,
    ) -> ResultEngine<Option<Load>> {
        loads::Entity::find_by_id(load_id.to_string())
            .one(db)
            .await?
            .map(Load::try_from)
            .transpose()
    }

    pub(super) async fn require_load<C: ConnectionTrait>(
        &self,
        db: &C,
        load_id: Uuid,
    ) -> ResultEngine<Load> {
        self.find_load(db, load_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("load not exists".to_string()))
    }

    pub(super) async fn require_fuel_purchase<C: ConnectionTrait>(
        &self,
        db: &C,
        purchase_id: Uuid,
    ) -> ResultEngine<FuelPurchase> {
        let model = fuel_purchases::Entity::find_by_id(purchase_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("fuel purchase not exists".to_string()))?;
        FuelPurchase::try_from(model)
    }

    pub(super) async fn require_breakdown<C: ConnectionTrait>(
        &self,
        db: &C,
        breakdown_id: Uuid,
    ) -> ResultEngine<CostBreakdown> {
        let model = cost_breakdowns::Entity::find_by_id(breakdown_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("cost breakdown not exists".to_string()))?;
        CostBreakdown::try_from(model)
    }

    /// Every load assigned to the truck, whatever its status.
    pub(super) async fn loads_for_truck<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
    ) -> ResultEngine<Vec<Load>> {
        loads::Entity::find()
            .filter(loads::Column::TruckId.eq(truck_id.to_string()))
            .order_by_asc(loads::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Load::try_from)
            .collect()
    }

    pub(super) async fn fuel_for_truck<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
    ) -> ResultEngine<Vec<FuelPurchase>> {
        fuel_purchases::Entity::find()
            .filter(fuel_purchases::Column::TruckId.eq(truck_id.to_string()))
            .order_by_asc(fuel_purchases::Column::PurchaseDate)
            .all(db)
            .await?
            .into_iter()
            .map(FuelPurchase::try_from)
            .collect()
    }

    pub(super) async fn breakdown_for_week<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
        week_starting: NaiveDate,
    ) -> ResultEngine<Option<CostBreakdown>> {
        cost_breakdowns::Entity::find()
            .filter(cost_breakdowns::Column::TruckId.eq(truck_id.to_string()))
            .filter(cost_breakdowns::Column::WeekStarting.eq(week_starting))
            .one(db)
            .await?
            .map(CostBreakdown::try_from)
            .transpose()
    }

    /// The row the truck cache mirrors: the active week when it exists, else
    /// the most recent earlier week. Rows entered ahead for future weeks are
    /// skipped.
    pub(super) async fn latest_breakdown<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
    ) -> ResultEngine<Option<CostBreakdown>> {
        let current = self.current_week();
        cost_breakdowns::Entity::find()
            .filter(cost_breakdowns::Column::TruckId.eq(truck_id.to_string()))
            .filter(cost_breakdowns::Column::WeekStarting.lte(current.week_starting))
            .order_by_desc(cost_breakdowns::Column::WeekStarting)
            .one(db)
            .await?
            .map(CostBreakdown::try_from)
            .transpose()
    }

    pub(super) async fn week_miles<C: ConnectionTrait>(
        &self,
        db: &C,
        truck_id: Uuid,
        week: &WeekWindow,
    ) -> ResultEngine<WeekMiles> {
        let mut miles = WeekMiles::default();
        for load in self.loads_for_truck(db, truck_id).await? {
            if load_in_week(&load, week) {
                let overflow = || {
                    EngineError::InvariantViolation(format!("truck {truck_id} week miles overflow"))
                };
                miles.revenue = miles.revenue.checked_add(load.miles).ok_or_else(overflow)?;
                miles.with_deadhead = miles
                    .with_deadhead
                    .checked_add(load.operational_miles())
                    .ok_or_else(overflow)?;
            }
        }
        Ok(miles)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{LoadStatus, MoneyCents, Place};

    fn load_at(created: chrono::DateTime<Utc>) -> Load {
        Load {
            id: Uuid::new_v4(),
            truck_id: None,
            status: LoadStatus::Pending,
            miles: 100,
            deadhead_from: None,
            deadhead_miles: 0,
            deadhead_source: None,
            total_miles_with_deadhead: Some(100),
            pay: MoneyCents::ZERO,
            origin: Place::new("Dallas", "TX"),
            destination: Place::new("Chicago", "IL"),
            rate_per_mile_minor: 0,
            profit: MoneyCents::ZERO,
            actual_cost_per_mile_minor: 0,
            pickup_at: None,
            created_at: created,
            delivered_at: None,
        }
    }

    #[test]
    fn load_counts_when_created_or_delivered_in_week() {
        let week = WeekWindow::starting(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            chrono_tz::Tz::UTC,
        );
        let inside = load_at(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());
        let mut older = load_at(Utc.with_ymd_and_hms(2026, 10, 10, 9, 0, 0).unwrap());

        assert!(load_in_week(&inside, &week));
        assert!(!load_in_week(&older, &week));

        older.delivered_at = Some(Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap());
        assert!(load_in_week(&older, &week));
    }
}
