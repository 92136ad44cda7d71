//! Weekly cost breakdowns, one row per truck and week.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CostLineItems, EngineError, MoneyCents, ResultEngine,
    cost::{self, CostTotals, MileBasis},
    util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub id: Uuid,
    pub truck_id: Uuid,
    /// Sunday that opens the week.
    pub week_starting: NaiveDate,
    pub items: CostLineItems,
    pub total_fixed_costs: MoneyCents,
    pub total_variable_costs: MoneyCents,
    pub total_weekly_costs: MoneyCents,
    pub cost_per_mile_minor: i64,
    pub gallons_used: f64,
    pub avg_fuel_price_minor: i64,
    pub miles_per_gallon: f64,
    /// Revenue miles of the week's loads.
    pub miles_this_week: i64,
    /// Revenue plus deadhead miles of the week's loads; the mile basis.
    pub total_miles_with_deadhead: i64,
    pub updated_at: DateTime<Utc>,
}

impl CostBreakdown {
    pub fn new(truck_id: Uuid, week_starting: NaiveDate, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            truck_id,
            week_starting,
            items: CostLineItems::default(),
            total_fixed_costs: MoneyCents::ZERO,
            total_variable_costs: MoneyCents::ZERO,
            total_weekly_costs: MoneyCents::ZERO,
            cost_per_mile_minor: 0,
            gallons_used: 0.0,
            avg_fuel_price_minor: 0,
            miles_per_gallon: 0.0,
            miles_this_week: 0,
            total_miles_with_deadhead: 0,
            updated_at,
        }
    }

    /// Reruns the calculator over the row's own line items and mile basis.
    ///
    /// `lifetime_miles` only decides between the standard basis and zero when
    /// the week has no miles.
    pub fn recalculate(&mut self, lifetime_miles: i64) -> ResultEngine<CostTotals> {
        let basis = MileBasis::resolve(self.total_miles_with_deadhead, lifetime_miles);
        let totals = cost::compute(&self.items, basis)?;
        self.total_fixed_costs = totals.fixed;
        self.total_variable_costs = totals.variable;
        self.total_weekly_costs = totals.weekly;
        self.cost_per_mile_minor = totals.cost_per_mile_minor;
        Ok(totals)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_breakdowns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub truck_id: String,
    pub week_starting: Date,
    pub truck_payment_minor: i64,
    pub trailer_payment_minor: i64,
    pub physical_damage_insurance_minor: i64,
    pub liability_insurance_minor: i64,
    pub cargo_insurance_minor: i64,
    pub bobtail_insurance_minor: i64,
    pub occupational_accident_insurance_minor: i64,
    pub eld_subscription_minor: i64,
    pub other_subscriptions_minor: i64,
    pub base_plate_minor: i64,
    pub phone_minor: i64,
    pub driver_pay_minor: i64,
    pub fuel_minor: i64,
    pub def_minor: i64,
    pub maintenance_minor: i64,
    pub tolls_minor: i64,
    pub dwell_time_minor: i64,
    pub reefer_fuel_minor: i64,
    pub parking_minor: i64,
    pub ifta_minor: i64,
    pub total_fixed_costs_minor: i64,
    pub total_variable_costs_minor: i64,
    pub total_weekly_costs_minor: i64,
    pub cost_per_mile_minor: i64,
    #[sea_orm(column_type = "Double")]
    pub gallons_used: f64,
    pub avg_fuel_price_minor: i64,
    #[sea_orm(column_type = "Double")]
    pub miles_per_gallon: f64,
    pub miles_this_week: i64,
    pub total_miles_with_deadhead: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trucks::Entity",
        from = "Column::TruckId",
        to = "super::trucks::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trucks,
}

impl Related<super::trucks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trucks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CostBreakdown> for ActiveModel {
    fn from(value: &CostBreakdown) -> Self {
        let items = &value.items;
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            truck_id: ActiveValue::Set(value.truck_id.to_string()),
            week_starting: ActiveValue::Set(value.week_starting),
            truck_payment_minor: ActiveValue::Set(items.truck_payment.cents()),
            trailer_payment_minor: ActiveValue::Set(items.trailer_payment.cents()),
            physical_damage_insurance_minor: ActiveValue::Set(
                items.physical_damage_insurance.cents(),
            ),
            liability_insurance_minor: ActiveValue::Set(items.liability_insurance.cents()),
            cargo_insurance_minor: ActiveValue::Set(items.cargo_insurance.cents()),
            bobtail_insurance_minor: ActiveValue::Set(items.bobtail_insurance.cents()),
            occupational_accident_insurance_minor: ActiveValue::Set(
                items.occupational_accident_insurance.cents(),
            ),
            eld_subscription_minor: ActiveValue::Set(items.eld_subscription.cents()),
            other_subscriptions_minor: ActiveValue::Set(items.other_subscriptions.cents()),
            base_plate_minor: ActiveValue::Set(items.base_plate.cents()),
            phone_minor: ActiveValue::Set(items.phone.cents()),
            driver_pay_minor: ActiveValue::Set(items.driver_pay.cents()),
            fuel_minor: ActiveValue::Set(items.fuel.cents()),
            def_minor: ActiveValue::Set(items.def.cents()),
            maintenance_minor: ActiveValue::Set(items.maintenance.cents()),
            tolls_minor: ActiveValue::Set(items.tolls.cents()),
            dwell_time_minor: ActiveValue::Set(items.dwell_time.cents()),
            reefer_fuel_minor: ActiveValue::Set(items.reefer_fuel.cents()),
            parking_minor: ActiveValue::Set(items.parking.cents()),
            ifta_minor: ActiveValue::Set(items.ifta.cents()),
            total_fixed_costs_minor: ActiveValue::Set(value.total_fixed_costs.cents()),
            total_variable_costs_minor: ActiveValue::Set(value.total_variable_costs.cents()),
            total_weekly_costs_minor: ActiveValue::Set(value.total_weekly_costs.cents()),
            cost_per_mile_minor: ActiveValue::Set(value.cost_per_mile_minor),
            gallons_used: ActiveValue::Set(value.gallons_used),
            avg_fuel_price_minor: ActiveValue::Set(value.avg_fuel_price_minor),
            miles_per_gallon: ActiveValue::Set(value.miles_per_gallon),
            miles_this_week: ActiveValue::Set(value.miles_this_week),
            total_miles_with_deadhead: ActiveValue::Set(value.total_miles_with_deadhead),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for CostBreakdown {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let items = CostLineItems {
            truck_payment: MoneyCents::new(model.truck_payment_minor),
            trailer_payment: MoneyCents::new(model.trailer_payment_minor),
            physical_damage_insurance: MoneyCents::new(model.physical_damage_insurance_minor),
            liability_insurance: MoneyCents::new(model.liability_insurance_minor),
            cargo_insurance: MoneyCents::new(model.cargo_insurance_minor),
            bobtail_insurance: MoneyCents::new(model.bobtail_insurance_minor),
            occupational_accident_insurance: MoneyCents::new(
                model.occupational_accident_insurance_minor,
            ),
            eld_subscription: MoneyCents::new(model.eld_subscription_minor),
            other_subscriptions: MoneyCents::new(model.other_subscriptions_minor),
            base_plate: MoneyCents::new(model.base_plate_minor),
            phone: MoneyCents::new(model.phone_minor),
            driver_pay: MoneyCents::new(model.driver_pay_minor),
            fuel: MoneyCents::new(model.fuel_minor),
            def: MoneyCents::new(model.def_minor),
            maintenance: MoneyCents::new(model.maintenance_minor),
            tolls: MoneyCents::new(model.tolls_minor),
            dwell_time: MoneyCents::new(model.dwell_time_minor),
            reefer_fuel: MoneyCents::new(model.reefer_fuel_minor),
            parking: MoneyCents::new(model.parking_minor),
            ifta: MoneyCents::new(model.ifta_minor),
        };
        Ok(Self {
            id: parse_uuid(&model.id, "cost breakdown")?,
            truck_id: parse_uuid(&model.truck_id, "truck")?,
            week_starting: model.week_starting,
            items,
            total_fixed_costs: MoneyCents::new(model.total_fixed_costs_minor),
            total_variable_costs: MoneyCents::new(model.total_variable_costs_minor),
            total_weekly_costs: MoneyCents::new(model.total_weekly_costs_minor),
            cost_per_mile_minor: model.cost_per_mile_minor,
            gallons_used: model.gallons_used,
            avg_fuel_price_minor: model.avg_fuel_price_minor,
            miles_per_gallon: model.miles_per_gallon,
            miles_this_week: model.miles_this_week,
            total_miles_with_deadhead: model.total_miles_with_deadhead,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn recalculate_refreshes_totals_from_own_items() {
        let week = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let mut row = CostBreakdown::new(Uuid::new_v4(), week, now);
        row.items.truck_payment = MoneyCents::new(100_000);
        row.items.fuel = MoneyCents::new(35_000);
        row.total_miles_with_deadhead = 900;

        row.recalculate(900).unwrap();
        assert_eq!(row.total_fixed_costs, MoneyCents::new(100_000));
        assert_eq!(row.total_variable_costs, MoneyCents::new(35_000));
        assert_eq!(row.total_weekly_costs, MoneyCents::new(135_000));
        assert_eq!(row.cost_per_mile_minor, 150);

        row.items.fuel = MoneyCents::ZERO;
        row.recalculate(900).unwrap();
        assert_eq!(row.total_variable_costs, MoneyCents::ZERO);
        assert_eq!(row.cost_per_mile_minor, 111);
    }
}
