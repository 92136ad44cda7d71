use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    Load, LoadStatus, MoneyCents, Place, ResultEngine, fuel_purchases, loads,
    locks::TruckGuards,
    util::{ensure_non_negative_miles, ensure_non_negative_money, normalize_place},
};

use super::{Engine, MutationKind, PipelineReport, profitability::priced, with_tx};

/// Input of [`Engine::new_load`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewLoad {
    pub truck_id: Option<Uuid>,
    pub miles: i64,
    pub pay: MoneyCents,
    pub origin: Place,
    pub destination: Place,
    #[serde(default)]
    pub pickup_at: Option<DateTime<Utc>>,
}

/// Partial edit of a load. Revenue miles cannot change.
///
/// `truck_id` and `pickup_at` are doubly optional: `None` leaves the field,
/// `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadUpdate {
    pub truck_id: Option<Option<Uuid>>,
    pub pay: Option<MoneyCents>,
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub pickup_at: Option<Option<DateTime<Utc>>>,
}

impl Engine {
    /// Detaches fuel purchases of `load_id` that do not belong to `keep_truck`.
    async fn detach_foreign_fuel(
        &self,
        db: &DatabaseTransaction,
        load_id: Uuid,
        keep_truck: Option<Uuid>,
    ) -> ResultEngine<u64> {
        let mut query = fuel_purchases::Entity::update_many()
            .col_expr(
                fuel_purchases::Column::LoadId,
                Expr::value(Option::<String>::None),
            )
            .filter(fuel_purchases::Column::LoadId.eq(load_id.to_string()));
        if let Some(truck_id) = keep_truck {
            query = query.filter(fuel_purchases::Column::TruckId.ne(truck_id.to_string()));
        }
        Ok(query.exec(db).await?.rows_affected)
    }

    async fn lock_load_trucks(&self, trucks: &[Option<Uuid>]) -> ResultEngine<TruckGuards> {
        let ids: Vec<Uuid> = trucks.iter().flatten().copied().collect();
        self.locks.acquire(&ids).await
    }

    /// Creates a load, `pending`. When it has a truck, the truck's miles,
    /// weekly figures and load profits are recomputed.
    pub async fn new_load(&self, input: NewLoad) -> ResultEngine<Load> {
        ensure_non_negative_miles(input.miles, "miles")?;
        ensure_non_negative_money(input.pay, "pay")?;
        let origin = normalize_place(&input.origin, "origin")?;
        let destination = normalize_place(&input.destination, "destination")?;

        let load_id = self
            .retry_on_contention("new_load", || {
                self.insert_load(&input, &origin, &destination)
            })
            .await?;
        self.load(load_id).await
    }

    async fn insert_load(
        &self,
        input: &NewLoad,
        origin: &Place,
        destination: &Place,
    ) -> ResultEngine<Uuid> {
        let guards = self.lock_load_trucks(&[input.truck_id]).await?;
        let now = self.now();
        let mut load = Load {
            id: Uuid::new_v4(),
            truck_id: input.truck_id,
            status: LoadStatus::Pending,
            miles: input.miles,
            deadhead_from: None,
            deadhead_miles: 0,
            deadhead_source: None,
            total_miles_with_deadhead: Some(input.miles),
            pay: input.pay,
            origin: origin.clone(),
            destination: destination.clone(),
            rate_per_mile_minor: 0,
            profit: MoneyCents::ZERO,
            actual_cost_per_mile_minor: 0,
            pickup_at: input.pickup_at,
            created_at: now,
            delivered_at: None,
        };
        let (profit, rate) = priced(&load, 0)?;
        load.profit = profit.net_profit;
        load.rate_per_mile_minor = rate;

        with_tx!(self, |db_tx| {
            if let Some(truck_id) = load.truck_id {
                self.require_truck(&db_tx, truck_id).await?;
            }
            let model: loads::ActiveModel = (&load).into();
            model.insert(&db_tx).await?;

            if load.truck_id.is_some() {
                self.run_pipeline(
                    &db_tx,
                    &MutationKind::LoadReassigned {
                        load_id: load.id,
                        previous_truck_id: None,
                        truck_id: load.truck_id,
                    },
                    &guards,
                )
                .await?;
            }
            info!(load_id = %load.id, truck_id = ?load.truck_id, miles = load.miles, "load created");
            Ok(load.id)
        })
    }

    /// Edits a load. Moving a not-yet-delivered load to another truck clears
    /// its deadhead, and fuel purchases of the old truck are detached from it.
    pub async fn update_load(&self, load_id: Uuid, update: LoadUpdate) -> ResultEngine<Load> {
        if let Some(pay) = update.pay {
            ensure_non_negative_money(pay, "pay")?;
        }
        let update = LoadUpdate {
            origin: update
                .origin
                .as_ref()
                .map(|p| normalize_place(p, "origin"))
                .transpose()?,
            destination: update
                .destination
                .as_ref()
                .map(|p| normalize_place(p, "destination"))
                .transpose()?,
            ..update
        };

        self.retry_on_contention("update_load", || self.write_load_update(load_id, &update))
            .await?;
        self.load(load_id).await
    }

    async fn write_load_update(&self, load_id: Uuid, update: &LoadUpdate) -> ResultEngine<()> {
        let before = self.require_load(&self.database, load_id).await?;
        let next_truck = update.truck_id.unwrap_or(before.truck_id);
        let guards = self
            .lock_load_trucks(&[before.truck_id, next_truck])
            .await?;

        with_tx!(self, |db_tx| {
            let mut load = self.require_load(&db_tx, load_id).await?;
            let previous_truck_id = load.truck_id;
            guards.ensure_covers(previous_truck_id)?;
            if let Some(truck_id) = next_truck {
                self.require_truck(&db_tx, truck_id).await?;
            }

            let reassigned = next_truck != previous_truck_id;
            load.truck_id = next_truck;
            if reassigned && load.status != LoadStatus::Delivered {
                load.deadhead_from = None;
                load.deadhead_miles = 0;
                load.deadhead_source = None;
                load.total_miles_with_deadhead = Some(load.miles);
            }
            if let Some(pay) = update.pay {
                load.pay = pay;
            }
            if let Some(origin) = &update.origin {
                load.origin = origin.clone();
            }
            if let Some(destination) = &update.destination {
                load.destination = destination.clone();
            }
            if let Some(pickup_at) = update.pickup_at {
                load.pickup_at = pickup_at;
            }
            if load.truck_id.is_none() {
                let (profit, rate) = priced(&load, 0)?;
                load.profit = profit.net_profit;
                load.rate_per_mile_minor = rate;
                load.actual_cost_per_mile_minor = 0;
            }

            let model: loads::ActiveModel = (&load).into();
            model.update(&db_tx).await?;
            if reassigned {
                let detached = self.detach_foreign_fuel(&db_tx, load_id, next_truck).await?;
                info!(%load_id, from = ?previous_truck_id, to = ?next_truck, detached, "load reassigned");
            }

            self.run_pipeline(
                &db_tx,
                &MutationKind::LoadReassigned {
                    load_id,
                    previous_truck_id,
                    truck_id: next_truck,
                },
                &guards,
            )
            .await?;
            Ok(())
        })
    }

    /// Deletes a load. Its fuel purchases stay with the truck, detached.
    pub async fn delete_load(&self, load_id: Uuid) -> ResultEngine<PipelineReport> {
        self.retry_on_contention("delete_load", || self.remove_load(load_id))
            .await
    }

    async fn remove_load(&self, load_id: Uuid) -> ResultEngine<PipelineReport> {
        let before = self.require_load(&self.database, load_id).await?;
        let guards = self.lock_load_trucks(&[before.truck_id]).await?;

        with_tx!(self, |db_tx| {
            let load = self.require_load(&db_tx, load_id).await?;
            guards.ensure_covers(load.truck_id)?;
            let detached = self.detach_foreign_fuel(&db_tx, load_id, None).await?;
            loads::Entity::delete_by_id(load_id.to_string())
                .exec(&db_tx)
                .await?;
            info!(%load_id, detached, "load deleted");

            self.run_pipeline(
                &db_tx,
                &MutationKind::LoadReassigned {
                    load_id,
                    previous_truck_id: load.truck_id,
                    truck_id: None,
                },
                &guards,
            )
            .await
        })
    }

    /// Moves a load forward in its lifecycle.
    ///
    /// Delivery runs the delivery pipeline (deadhead, miles, weekly fuel,
    /// profits) and returns its report.
    pub async fn set_load_status(
        &self,
        load_id: Uuid,
        status: LoadStatus,
    ) -> ResultEngine<Option<PipelineReport>> {
        self.retry_on_contention("set_load_status", || self.write_load_status(load_id, status))
            .await
    }

    async fn write_load_status(
        &self,
        load_id: Uuid,
        status: LoadStatus,
    ) -> ResultEngine<Option<PipelineReport>> {
        let before = self.require_load(&self.database, load_id).await?;
        before.status.transition_to(status)?;
        let guards = self.lock_load_trucks(&[before.truck_id]).await?;

        with_tx!(self, |db_tx| {
            let load = self.require_load(&db_tx, load_id).await?;
            guards.ensure_covers(load.truck_id)?;
            let next = load.status.transition_to(status)?;
            let delivered_at = (next == LoadStatus::Delivered).then(|| self.now());

            loads::ActiveModel {
                id: ActiveValue::Set(load_id.to_string()),
                status: ActiveValue::Set(next.as_str().to_string()),
                delivered_at: ActiveValue::Set(delivered_at.or(load.delivered_at)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            info!(%load_id, from = load.status.as_str(), to = next.as_str(), "load status changed");

            if next == LoadStatus::Delivered {
                let report = self
                    .run_pipeline(&db_tx, &MutationKind::LoadDelivered { load_id }, &guards)
                    .await?;
                Ok(Some(report))
            } else {
                Ok(None)
            }
        })
    }

    pub async fn load(&self, load_id: Uuid) -> ResultEngine<Load> {
        self.require_load(&self.database, load_id).await
    }

    /// Loads of a truck, oldest first.
    pub async fn truck_loads(&self, truck_id: Uuid) -> ResultEngine<Vec<Load>> {
        with_tx!(self, |db_tx| {
            self.require_truck(&db_tx, truck_id).await?;
            self.loads_for_truck(&db_tx, truck_id).await
        })
    }

    /// Loads without a truck.
    pub async fn unassigned_loads(&self) -> ResultEngine<Vec<Load>> {
        loads::Entity::find()
            .filter(loads::Column::TruckId.is_null())
            .all(&self.database)
            .await?
            .into_iter()
            .map(Load::try_from)
            .collect()
    }
}

