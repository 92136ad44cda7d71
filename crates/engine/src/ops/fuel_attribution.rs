use sea_orm::DatabaseTransaction;
use tracing::debug;
use uuid::Uuid;

use crate::{
    CostBreakdown, FuelPurchase, MoneyCents, ResultEngine, money::round_cents, week::WeekWindow,
};

use super::Engine;

/// Fuel figures of one truck and week, from attached purchases only.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(super) struct WeeklyFuel {
    pub total_cost: MoneyCents,
    pub gallons: f64,
    /// Cents per gallon.
    pub avg_price_minor: i64,
    pub miles_per_gallon: f64,
}

impl WeeklyFuel {
    pub(super) fn from_purchases<'a>(
        purchases: impl IntoIterator<Item = &'a FuelPurchase>,
        week: &WeekWindow,
        miles_with_deadhead: i64,
    ) -> Self {
        let mut out = Self::default();
        for purchase in purchases {
            if purchase.is_attached() && week.contains(purchase.purchase_date) {
                out.total_cost += purchase.total_cost;
                out.gallons += purchase.gallons;
            }
        }
        if out.gallons > 0.0 {
            out.avg_price_minor = round_cents(out.total_cost.as_f64() / out.gallons);
            if miles_with_deadhead > 0 {
                out.miles_per_gallon = miles_with_deadhead as f64 / out.gallons;
            }
        }
        out
    }
}

impl Engine {
    /// Rewrites the active week's fuel, gallons, MPG and mile basis for the
    /// truck, then its totals and the truck cache.
    ///
    /// The week's row is created only when there is fuel to record.
    pub(super) async fn recompute_weekly_fuel(
        &self,
        db: &DatabaseTransaction,
        truck_id: Uuid,
    ) -> ResultEngine<Option<CostBreakdown>> {
        let week = self.current_week();
        let truck = self.require_truck(db, truck_id).await?;
        let miles = self.week_miles(db, truck_id, &week).await?;
        let purchases = self.fuel_for_truck(db, truck_id).await?;
        let fuel = WeeklyFuel::from_purchases(&purchases, &week, miles.with_deadhead);

        let existing = self
            .breakdown_for_week(db, truck_id, week.week_starting)
            .await?;
        let exists = existing.is_some();
        let mut row = match existing {
            Some(row) => row,
            None if fuel.total_cost.cents() > 0 => {
                CostBreakdown::new(truck_id, week.week_starting, self.now())
            }
            None => {
                self.refresh_truck_cache(db, truck_id).await?;
                debug!(%truck_id, "no fuel this week, no breakdown row");
                return Ok(None);
            }
        };

        row.items.fuel = fuel.total_cost;
        row.gallons_used = fuel.gallons;
        row.avg_fuel_price_minor = fuel.avg_price_minor;
        row.miles_per_gallon = fuel.miles_per_gallon;
        row.miles_this_week = miles.revenue;
        row.total_miles_with_deadhead = miles.with_deadhead;
        self.persist_breakdown(db, &mut row, truck.total_miles, exists)
            .await?;
        self.refresh_truck_cache(db, truck_id).await?;

        debug!(
            %truck_id,
            fuel = %row.items.fuel,
            gallons = row.gallons_used,
            mpg = row.miles_per_gallon,
            "weekly fuel recomputed"
        );
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::FuelType;

    fn week() -> WeekWindow {
        WeekWindow::starting(
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            chrono_tz::Tz::UTC,
        )
    }

    fn purchase(gallons: f64, cents: i64, attached: bool, day: u32) -> FuelPurchase {
        FuelPurchase {
            id: Uuid::new_v4(),
            truck_id: Uuid::new_v4(),
            load_id: attached.then(Uuid::new_v4),
            gallons,
            total_cost: MoneyCents::new(cents),
            purchase_date: Utc.with_ymd_and_hms(2026, 10, day, 10, 0, 0).unwrap(),
            fuel_type: FuelType::Diesel,
        }
    }

    #[test]
    fn attached_purchase_sets_price_and_mpg() {
        let fuel = WeeklyFuel::from_purchases(&[purchase(100.0, 35_000, true, 19)], &week(), 620);
        assert_eq!(fuel.total_cost, MoneyCents::new(35_000));
        assert_eq!(fuel.gallons, 100.0);
        assert_eq!(fuel.avg_price_minor, 350);
        assert_eq!(fuel.miles_per_gallon, 6.2);
    }

    #[test]
    fn unattached_and_out_of_week_purchases_are_ignored() {
        let purchases = [
            purchase(50.0, 20_000, false, 19),
            purchase(80.0, 30_000, true, 12),
        ];
        let fuel = WeeklyFuel::from_purchases(&purchases, &week(), 500);
        assert_eq!(fuel, WeeklyFuel::default());
    }

    #[test]
    fn no_miles_means_no_mpg() {
        let fuel = WeeklyFuel::from_purchases(&[purchase(40.0, 14_000, true, 20)], &week(), 0);
        assert_eq!(fuel.avg_price_minor, 350);
        assert_eq!(fuel.miles_per_gallon, 0.0);
    }
}
