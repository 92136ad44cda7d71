use sea_orm::{DatabaseTransaction, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, trucks};

use super::Engine;

impl Engine {
    /// Rewrites the truck's lifetime miles from its loads.
    ///
    /// Every load counts regardless of status: revenue miles plus deadhead.
    /// A truck without loads has 0 miles.
    pub(super) async fn recompute_total_miles(
        &self,
        db: &DatabaseTransaction,
        truck_id: Uuid,
    ) -> ResultEngine<i64> {
        let mut total: i64 = 0;
        for load in self.loads_for_truck(db, truck_id).await? {
            let miles = load.operational_miles();
            if miles < 0 {
                return Err(EngineError::InvariantViolation(format!(
                    "load {} has negative miles ({miles})",
                    load.id
                )));
            }
            total = total.checked_add(miles).ok_or_else(|| {
                EngineError::InvariantViolation(format!("truck {truck_id} miles overflow"))
            })?;
        }

        trucks::mileage_update(truck_id, total)?.update(db).await?;
        debug!(%truck_id, total_miles = total, "total miles recomputed");
        Ok(total)
    }
}
