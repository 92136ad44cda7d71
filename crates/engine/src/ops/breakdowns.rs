use chrono::{Datelike, NaiveDate, Weekday};
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    CostBreakdown, CostLineItems, EngineError, MoneyCents, ResultEngine, cost_breakdowns,
    trucks::TruckCache, week::WeekWindow,
};

use super::{Engine, MutationKind, with_tx};

impl Engine {
    /// Inserts or updates the row, always with freshly computed totals.
    pub(super) async fn persist_breakdown(
        &self,
        db: &DatabaseTransaction,
        row: &mut CostBreakdown,
        lifetime_miles: i64,
        exists: bool,
    ) -> ResultEngine<()> {
        row.recalculate(lifetime_miles)?;
        row.updated_at = self.now();
        let model: cost_breakdowns::ActiveModel = (&*row).into();
        if exists {
            model.update(db).await?;
        } else {
            model.insert(db).await?;
        }
        Ok(())
    }

    /// Points the truck cache at its active (or latest past) week, recomputing
    /// that row first.
    ///
    /// A truck without any breakdown has a zero cache.
    pub(super) async fn refresh_truck_cache(
        &self,
        db: &DatabaseTransaction,
        truck_id: Uuid,
    ) -> ResultEngine<TruckCache> {
        let truck = self.require_truck(db, truck_id).await?;
        let cache = match self.latest_breakdown(db, truck_id).await? {
            Some(mut row) => {
                let before = row.clone();
                row.recalculate(truck.total_miles)?;
                if row != before {
                    self.persist_breakdown(db, &mut row, truck.total_miles, true)
                        .await?;
                }
                TruckCache {
                    fixed_costs: row.total_fixed_costs,
                    variable_costs: row.total_variable_costs,
                    cost_per_mile_minor: row.cost_per_mile_minor,
                }
            }
            None => TruckCache {
                fixed_costs: MoneyCents::ZERO,
                variable_costs: MoneyCents::ZERO,
                cost_per_mile_minor: 0,
            },
        };
        cache.active_model(truck_id).update(db).await?;
        debug!(%truck_id, cost_per_mile_minor = cache.cost_per_mile_minor, "truck cache written");
        Ok(cache)
    }

    /// Reruns the calculator over one row, then refreshes the truck cache.
    pub(super) async fn recompute_breakdown(
        &self,
        db: &DatabaseTransaction,
        breakdown_id: Uuid,
    ) -> ResultEngine<CostBreakdown> {
        let mut row = self.require_breakdown(db, breakdown_id).await?;
        let truck = self.require_truck(db, row.truck_id).await?;
        self.persist_breakdown(db, &mut row, truck.total_miles, true)
            .await?;
        self.refresh_truck_cache(db, row.truck_id).await?;
        Ok(row)
    }

    /// Manual weekly entry of the line items of one truck and week.
    ///
    /// `week_starting` must be a Sunday. The mile basis is taken from the
    /// truck's loads in that week. For the active week the `fuel` item stays
    /// owned by fuel attribution and the value given here is ignored.
    pub async fn upsert_cost_breakdown(
        &self,
        truck_id: Uuid,
        week_starting: NaiveDate,
        items: CostLineItems,
    ) -> ResultEngine<CostBreakdown> {
        items.validate()?;
        if week_starting.weekday() != Weekday::Sun {
            return Err(EngineError::InvalidAmount(format!(
                "week must start on a Sunday, got {week_starting}"
            )));
        }

        let breakdown_id = self
            .retry_on_contention("upsert_cost_breakdown", || {
                self.write_breakdown_items(truck_id, week_starting, items)
            })
            .await?;
        self.cost_breakdown(breakdown_id).await
    }

    async fn write_breakdown_items(
        &self,
        truck_id: Uuid,
        week_starting: NaiveDate,
        items: CostLineItems,
    ) -> ResultEngine<Uuid> {
        let guards = self.locks.acquire(&[truck_id]).await?;
        let current = self.current_week();
        let week = WeekWindow::starting(week_starting, self.timezone);

        with_tx!(self, |db_tx| {
            let truck = self.require_truck(&db_tx, truck_id).await?;
            let existing = self
                .breakdown_for_week(&db_tx, truck_id, week_starting)
                .await?;
            let exists = existing.is_some();
            let mut row = existing
                .unwrap_or_else(|| CostBreakdown::new(truck_id, week_starting, self.now()));

            let attributed_fuel = row.items.fuel;
            row.items = items;
            let miles = self.week_miles(&db_tx, truck_id, &week).await?;
            row.miles_this_week = miles.revenue;
            row.total_miles_with_deadhead = miles.with_deadhead;
            if week_starting == current.week_starting {
                row.items.fuel = attributed_fuel;
            }
            self.persist_breakdown(&db_tx, &mut row, truck.total_miles, exists)
                .await?;

            let report = self
                .run_pipeline(
                    &db_tx,
                    &MutationKind::BreakdownEdited {
                        breakdown_id: row.id,
                    },
                    &guards,
                )
                .await?;
            info!(
                %truck_id,
                %week_starting,
                trucks = report.trucks.len(),
                "cost breakdown saved"
            );
            Ok(row.id)
        })
    }

    pub async fn cost_breakdown(&self, breakdown_id: Uuid) -> ResultEngine<CostBreakdown> {
        self.require_breakdown(&self.database, breakdown_id).await
    }

    /// Every week recorded for the truck, newest first.
    pub async fn cost_breakdowns(&self, truck_id: Uuid) -> ResultEngine<Vec<CostBreakdown>> {
        with_tx!(self, |db_tx| {
            self.require_truck(&db_tx, truck_id).await?;
            cost_breakdowns::Entity::find()
                .filter(cost_breakdowns::Column::TruckId.eq(truck_id.to_string()))
                .order_by_desc(cost_breakdowns::Column::WeekStarting)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(CostBreakdown::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
