//! The module contains the `Truck` type and its table.
//!
//! A truck carries denormalized caches of derived figures (`total_miles`,
//! weekly fixed/variable costs, cost-per-mile) so reads never recompute.
//! Those caches are written only through [`TruckCache`] and
//! [`mileage_update`], which the recomputation pipelines own.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    /// Lifetime miles: revenue plus deadhead over every load of the truck.
    pub total_miles: i64,
    pub fixed_costs: MoneyCents,
    pub variable_costs: MoneyCents,
    /// Rounded cents per mile, the figure every profit computation uses.
    pub cost_per_mile_minor: i64,
    pub created_at: DateTime<Utc>,
}

impl Truck {
    pub fn new(owner_id: String, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            total_miles: 0,
            fixed_costs: MoneyCents::ZERO,
            variable_costs: MoneyCents::ZERO,
            cost_per_mile_minor: 0,
            created_at,
        }
    }
}

/// Weekly cost figures mirrored from the truck's active (or latest past) cost breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TruckCache {
    pub fixed_costs: MoneyCents,
    pub variable_costs: MoneyCents,
    pub cost_per_mile_minor: i64,
}

impl TruckCache {
    pub(crate) fn active_model(self, truck_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(truck_id.to_string()),
            fixed_costs_minor: ActiveValue::Set(self.fixed_costs.cents()),
            variable_costs_minor: ActiveValue::Set(self.variable_costs.cents()),
            cost_per_mile_minor: ActiveValue::Set(self.cost_per_mile_minor),
            ..Default::default()
        }
    }
}

/// Partial update writing only the lifetime miles cache.
pub(crate) fn mileage_update(truck_id: Uuid, total_miles: i64) -> ResultEngine<ActiveModel> {
    if total_miles < 0 {
        return Err(EngineError::InvariantViolation(format!(
            "truck {truck_id} would have negative total miles ({total_miles})"
        )));
    }
    Ok(ActiveModel {
        id: ActiveValue::Set(truck_id.to_string()),
        total_miles: ActiveValue::Set(total_miles),
        ..Default::default()
    })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trucks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub total_miles: i64,
    pub fixed_costs_minor: i64,
    pub variable_costs_minor: i64,
    pub cost_per_mile_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loads::Entity")]
    Loads,
    #[sea_orm(has_many = "super::fuel_purchases::Entity")]
    FuelPurchases,
    #[sea_orm(has_many = "super::cost_breakdowns::Entity")]
    CostBreakdowns,
}

impl Related<super::loads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loads.def()
    }
}

impl Related<super::fuel_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FuelPurchases.def()
    }
}

impl Related<super::cost_breakdowns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostBreakdowns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Truck> for ActiveModel {
    fn from(value: &Truck) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            total_miles: ActiveValue::Set(value.total_miles),
            fixed_costs_minor: ActiveValue::Set(value.fixed_costs.cents()),
            variable_costs_minor: ActiveValue::Set(value.variable_costs.cents()),
            cost_per_mile_minor: ActiveValue::Set(value.cost_per_mile_minor),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Truck {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "truck")?,
            owner_id: model.owner_id,
            name: model.name,
            total_miles: model.total_miles,
            fixed_costs: MoneyCents::new(model.fixed_costs_minor),
            variable_costs: MoneyCents::new(model.variable_costs_minor),
            cost_per_mile_minor: model.cost_per_mile_minor,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mileage_update_rejects_negative_miles() {
        let id = Uuid::new_v4();
        let err = mileage_update(id, -1).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let model = mileage_update(id, 120).unwrap();
        assert_eq!(model.total_miles, ActiveValue::Set(120));
        assert_eq!(model.cost_per_mile_minor, ActiveValue::NotSet);
    }

    #[test]
    fn cache_update_only_touches_cost_columns() {
        let id = Uuid::new_v4();
        let model = TruckCache {
            fixed_costs: MoneyCents::new(100_000),
            variable_costs: MoneyCents::new(50_000),
            cost_per_mile_minor: 75,
        }
        .active_model(id);

        assert_eq!(model.id, ActiveValue::Set(id.to_string()));
        assert_eq!(model.cost_per_mile_minor, ActiveValue::Set(75));
        assert_eq!(model.total_miles, ActiveValue::NotSet);
        assert_eq!(model.name, ActiveValue::NotSet);
    }
}
