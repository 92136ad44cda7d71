//! Load and fleet profitability.
//!
//! Costs are always charged with the rounded cost-per-mile (whole cents per
//! mile), so a profit figure reconciles exactly with the cost-per-mile shown
//! next to it.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Load, MoneyCents, ResultEngine, Truck, money::round_cents};

fn overflow(what: &str) -> EngineError {
    EngineError::InvariantViolation(format!("{what} overflow"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProfit {
    pub total_cost_per_mile_minor: i64,
    pub net_profit: MoneyCents,
    pub profit_per_mile_minor: i64,
}

/// Profit of a trip of `miles` revenue miles paying `pay`.
pub fn for_trip(
    miles: i64,
    pay: MoneyCents,
    truck_cost_per_mile_minor: i64,
    fuel_cost_per_mile_minor: i64,
) -> ResultEngine<LoadProfit> {
    let total_cost_per_mile_minor = truck_cost_per_mile_minor
        .checked_add(fuel_cost_per_mile_minor)
        .ok_or_else(|| overflow("cost per mile"))?;
    let cost = total_cost_per_mile_minor
        .checked_mul(miles)
        .map(MoneyCents::new)
        .ok_or_else(|| overflow("trip cost"))?;
    let net_profit = pay
        .checked_sub(cost)
        .ok_or_else(|| overflow("trip profit"))?;
    let profit_per_mile_minor = if miles > 0 {
        round_cents(net_profit.as_f64() / miles as f64)
    } else {
        0
    };
    Ok(LoadProfit {
        total_cost_per_mile_minor,
        net_profit,
        profit_per_mile_minor,
    })
}

pub fn for_load(
    load: &Load,
    truck: &Truck,
    fuel_cost_per_mile_minor: i64,
) -> ResultEngine<LoadProfit> {
    for_trip(
        load.miles,
        load.pay,
        truck.cost_per_mile_minor,
        fuel_cost_per_mile_minor,
    )
}

/// Rate the load pays per revenue mile, in cents.
pub fn rate_per_mile_minor(load: &Load) -> i64 {
    if load.miles > 0 {
        round_cents(load.pay.as_f64() / load.miles as f64)
    } else {
        0
    }
}

/// One truck's contribution to the fleet figures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TruckOperations {
    pub revenue: MoneyCents,
    pub operational_miles: i64,
    pub cost_per_mile_minor: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetProfit {
    pub revenue: MoneyCents,
    pub operational_miles: i64,
    pub operating_cost: MoneyCents,
    pub gross_profit: MoneyCents,
    /// Percent of revenue, two decimals.
    pub profit_margin: f64,
}

pub fn fleet(trucks: impl IntoIterator<Item = TruckOperations>) -> ResultEngine<FleetProfit> {
    let mut out = FleetProfit::default();
    for truck in trucks {
        let cost = truck
            .cost_per_mile_minor
            .checked_mul(truck.operational_miles)
            .map(MoneyCents::new)
            .ok_or_else(|| overflow("fleet cost"))?;
        out.revenue = out
            .revenue
            .checked_add(truck.revenue)
            .ok_or_else(|| overflow("fleet revenue"))?;
        out.operational_miles = out
            .operational_miles
            .checked_add(truck.operational_miles)
            .ok_or_else(|| overflow("fleet miles"))?;
        out.operating_cost = out
            .operating_cost
            .checked_add(cost)
            .ok_or_else(|| overflow("fleet cost"))?;
    }
    out.gross_profit = out
        .revenue
        .checked_sub(out.operating_cost)
        .ok_or_else(|| overflow("fleet profit"))?;
    out.profit_margin = if out.revenue.cents() > 0 {
        let percent = out.gross_profit.as_f64() / out.revenue.as_f64() * 100.0;
        (percent * 100.0).round() / 100.0
    } else {
        0.0
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_profit_uses_truck_and_fuel_cost() {
        // $1200 for 500 miles at $0.75 + $0.10 per mile.
        let profit = for_trip(500, MoneyCents::new(120_000), 75, 10).unwrap();
        assert_eq!(profit.total_cost_per_mile_minor, 85);
        assert_eq!(profit.net_profit, MoneyCents::new(77_500));
        assert_eq!(profit.profit_per_mile_minor, 155);
    }

    #[test]
    fn zero_mile_trip_has_zero_profit_per_mile() {
        let profit = for_trip(0, MoneyCents::new(5_000), 75, 0).unwrap();
        assert_eq!(profit.net_profit, MoneyCents::new(5_000));
        assert_eq!(profit.profit_per_mile_minor, 0);
    }

    #[test]
    fn losing_trip_is_negative() {
        let profit = for_trip(1000, MoneyCents::new(50_000), 75, 0).unwrap();
        assert_eq!(profit.net_profit, MoneyCents::new(-25_000));
        assert_eq!(profit.profit_per_mile_minor, -25);
    }

    #[test]
    fn fleet_sums_trucks_with_rounded_cost_per_mile() {
        let summary = fleet([
            TruckOperations {
                revenue: MoneyCents::new(300_000),
                operational_miles: 2000,
                cost_per_mile_minor: 75,
            },
            TruckOperations {
                revenue: MoneyCents::new(100_000),
                operational_miles: 1000,
                cost_per_mile_minor: 60,
            },
        ])
        .unwrap();
        assert_eq!(summary.revenue, MoneyCents::new(400_000));
        assert_eq!(summary.operational_miles, 3000);
        assert_eq!(summary.operating_cost, MoneyCents::new(210_000));
        assert_eq!(summary.gross_profit, MoneyCents::new(190_000));
        assert_eq!(summary.profit_margin, 47.5);
    }

    #[test]
    fn empty_fleet_has_zero_margin() {
        let summary = fleet(Vec::new()).unwrap();
        assert_eq!(summary.gross_profit, MoneyCents::ZERO);
        assert_eq!(summary.profit_margin, 0.0);
    }

    #[test]
    fn oversized_trip_is_rejected_not_wrapped() {
        let err = for_trip(i64::MAX / 2, MoneyCents::ZERO, 10, 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let err = for_trip(10, MoneyCents::ZERO, i64::MAX, 1).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let err = for_trip(1, MoneyCents::new(i64::MIN), 1, 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn oversized_fleet_is_rejected_not_wrapped() {
        let err = fleet([TruckOperations {
            revenue: MoneyCents::new(100),
            operational_miles: i64::MAX,
            cost_per_mile_minor: 2,
        }])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let err = fleet([
            TruckOperations {
                revenue: MoneyCents::new(i64::MAX),
                operational_miles: 0,
                cost_per_mile_minor: 0,
            },
            TruckOperations {
                revenue: MoneyCents::new(1),
                operational_miles: 0,
                cost_per_mile_minor: 0,
            },
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }
}
