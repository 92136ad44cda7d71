use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use tracing::info;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Truck, trucks, util::normalize_name};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn owner_trucks<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
    ) -> ResultEngine<Vec<Truck>> {
        trucks::Entity::find()
            .filter(trucks::Column::OwnerId.eq(owner_id.to_string()))
            .order_by_asc(trucks::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Truck::try_from)
            .collect()
    }

    /// Registers a truck. It starts in the zero state: no miles, no costs.
    pub async fn new_truck(&self, owner_id: &str, name: &str) -> ResultEngine<Truck> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(EngineError::InvalidId("owner id must not be empty".to_string()));
        }
        let name = normalize_name(name, "truck")?;
        let truck = Truck::new(owner_id.to_string(), name, self.now());

        with_tx!(self, |db_tx| {
            let model: trucks::ActiveModel = (&truck).into();
            model.insert(&db_tx).await?;
            info!(truck_id = %truck.id, owner_id, "truck registered");
            Ok(truck)
        })
    }

    pub async fn truck(&self, truck_id: Uuid) -> ResultEngine<Truck> {
        self.require_truck(&self.database, truck_id).await
    }

    pub async fn trucks_for_owner(&self, owner_id: &str) -> ResultEngine<Vec<Truck>> {
        self.owner_trucks(&self.database, owner_id).await
    }

    /// Renames a truck. Derived figures are left untouched.
    pub async fn rename_truck(&self, truck_id: Uuid, name: &str) -> ResultEngine<Truck> {
        let name = normalize_name(name, "truck")?;
        with_tx!(self, |db_tx| {
            self.require_truck(&db_tx, truck_id).await?;
            trucks::ActiveModel {
                id: ActiveValue::Set(truck_id.to_string()),
                name: ActiveValue::Set(name),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            self.require_truck(&db_tx, truck_id).await
        })
    }
}
