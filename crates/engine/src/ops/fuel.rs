use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, FuelPurchase, FuelType, MoneyCents, ResultEngine, fuel_purchases,
    util::{ensure_gallons, ensure_non_negative_money},
};

use super::{Engine, MutationKind, with_tx};

/// Input of [`Engine::new_fuel_purchase`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewFuelPurchase {
    pub truck_id: Uuid,
    #[serde(default)]
    pub load_id: Option<Uuid>,
    pub gallons: f64,
    pub total_cost: MoneyCents,
    pub purchase_date: DateTime<Utc>,
    pub fuel_type: FuelType,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FuelPurchaseUpdate {
    pub gallons: Option<f64>,
    pub total_cost: Option<MoneyCents>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub fuel_type: Option<FuelType>,
}

/// Change applied to one purchase under its truck's lock.
enum FuelChange {
    Edit(FuelPurchaseUpdate),
    Attach(Uuid),
    Detach,
    Delete,
}

impl FuelChange {
    fn name(&self) -> &'static str {
        match self {
            Self::Edit(_) => "update_fuel_purchase",
            Self::Attach(_) => "attach_fuel_purchase",
            Self::Detach => "detach_fuel_purchase",
            Self::Delete => "delete_fuel_purchase",
        }
    }
}

impl Engine {
    /// A purchase may only be attached to a load of its own truck.
    async fn ensure_load_on_truck(
        &self,
        db: &DatabaseTransaction,
        load_id: Uuid,
        truck_id: Uuid,
    ) -> ResultEngine<()> {
        let load = self.require_load(db, load_id).await?;
        if load.truck_id != Some(truck_id) {
            return Err(EngineError::InvalidId(format!(
                "load {load_id} is not assigned to truck {truck_id}"
            )));
        }
        Ok(())
    }

    /// Records a purchase. It counts toward the week's fuel only once
    /// attached to a load.
    pub async fn new_fuel_purchase(&self, input: NewFuelPurchase) -> ResultEngine<FuelPurchase> {
        ensure_gallons(input.gallons)?;
        ensure_non_negative_money(input.total_cost, "total cost")?;
        let purchase = FuelPurchase {
            id: Uuid::new_v4(),
            truck_id: input.truck_id,
            load_id: input.load_id,
            gallons: input.gallons,
            total_cost: input.total_cost,
            purchase_date: input.purchase_date,
            fuel_type: input.fuel_type,
        };

        self.retry_on_contention("new_fuel_purchase", || self.insert_fuel_purchase(&purchase))
            .await?;
        Ok(purchase)
    }

    async fn insert_fuel_purchase(&self, purchase: &FuelPurchase) -> ResultEngine<()> {
        let guards = self.locks.acquire(&[purchase.truck_id]).await?;
        with_tx!(self, |db_tx| {
            self.require_truck(&db_tx, purchase.truck_id).await?;
            if let Some(load_id) = purchase.load_id {
                self.ensure_load_on_truck(&db_tx, load_id, purchase.truck_id)
                    .await?;
            }
            let model: fuel_purchases::ActiveModel = purchase.into();
            model.insert(&db_tx).await?;
            info!(
                purchase_id = %purchase.id,
                truck_id = %purchase.truck_id,
                attached = purchase.is_attached(),
                "fuel purchase recorded"
            );

            self.run_pipeline(
                &db_tx,
                &MutationKind::FuelPurchaseChanged {
                    truck_id: purchase.truck_id,
                },
                &guards,
            )
            .await?;
            Ok(())
        })
    }

    pub async fn update_fuel_purchase(
        &self,
        purchase_id: Uuid,
        update: FuelPurchaseUpdate,
    ) -> ResultEngine<FuelPurchase> {
        if let Some(gallons) = update.gallons {
            ensure_gallons(gallons)?;
        }
        if let Some(cost) = update.total_cost {
            ensure_non_negative_money(cost, "total cost")?;
        }
        self.change_fuel_purchase(purchase_id, FuelChange::Edit(update))
            .await?;
        self.fuel_purchase(purchase_id).await
    }

    /// Links a purchase to a load of the same truck.
    pub async fn attach_fuel_purchase(
        &self,
        purchase_id: Uuid,
        load_id: Uuid,
    ) -> ResultEngine<FuelPurchase> {
        self.change_fuel_purchase(purchase_id, FuelChange::Attach(load_id))
            .await?;
        self.fuel_purchase(purchase_id).await
    }

    pub async fn detach_fuel_purchase(&self, purchase_id: Uuid) -> ResultEngine<FuelPurchase> {
        self.change_fuel_purchase(purchase_id, FuelChange::Detach)
            .await?;
        self.fuel_purchase(purchase_id).await
    }

    pub async fn delete_fuel_purchase(&self, purchase_id: Uuid) -> ResultEngine<()> {
        self.change_fuel_purchase(purchase_id, FuelChange::Delete)
            .await
    }

    async fn change_fuel_purchase(&self, purchase_id: Uuid, change: FuelChange) -> ResultEngine<()> {
        self.retry_on_contention(change.name(), || {
            self.write_fuel_change(purchase_id, &change)
        })
        .await
    }

    /// Applies `change` and reruns fuel attribution for the owning truck.
    async fn write_fuel_change(&self, purchase_id: Uuid, change: &FuelChange) -> ResultEngine<()> {
        let before = self
            .require_fuel_purchase(&self.database, purchase_id)
            .await?;
        let guards = self.locks.acquire(&[before.truck_id]).await?;

        with_tx!(self, |db_tx| {
            let mut purchase = self.require_fuel_purchase(&db_tx, purchase_id).await?;
            guards.ensure_covers(Some(purchase.truck_id))?;

            match change {
                FuelChange::Edit(update) => {
                    if let Some(gallons) = update.gallons {
                        purchase.gallons = gallons;
                    }
                    if let Some(cost) = update.total_cost {
                        purchase.total_cost = cost;
                    }
                    if let Some(date) = update.purchase_date {
                        purchase.purchase_date = date;
                    }
                    if let Some(fuel_type) = update.fuel_type {
                        purchase.fuel_type = fuel_type;
                    }
                }
                FuelChange::Attach(load_id) => {
                    self.ensure_load_on_truck(&db_tx, *load_id, purchase.truck_id)
                        .await?;
                    purchase.load_id = Some(*load_id);
                }
                FuelChange::Detach => purchase.load_id = None,
                FuelChange::Delete => {}
            }

            if matches!(change, FuelChange::Delete) {
                fuel_purchases::Entity::delete_by_id(purchase_id.to_string())
                    .exec(&db_tx)
                    .await?;
            } else {
                let model: fuel_purchases::ActiveModel = (&purchase).into();
                model.update(&db_tx).await?;
            }
            info!(
                %purchase_id,
                change = change.name(),
                load_id = ?purchase.load_id,
                "fuel purchase changed"
            );

            self.run_pipeline(
                &db_tx,
                &MutationKind::FuelPurchaseChanged {
                    truck_id: purchase.truck_id,
                },
                &guards,
            )
            .await?;
            Ok(())
        })
    }

    pub async fn fuel_purchase(&self, purchase_id: Uuid) -> ResultEngine<FuelPurchase> {
        self.require_fuel_purchase(&self.database, purchase_id)
            .await
    }

    /// Every purchase of the truck, attached or not, oldest first.
    pub async fn truck_fuel_purchases(&self, truck_id: Uuid) -> ResultEngine<Vec<FuelPurchase>> {
        with_tx!(self, |db_tx| {
            self.require_truck(&db_tx, truck_id).await?;
            self.fuel_for_truck(&db_tx, truck_id).await
        })
    }
}
